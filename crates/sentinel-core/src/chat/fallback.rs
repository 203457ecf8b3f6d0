//! Canned replies used when no text generator answers

use rand::seq::SliceRandom;
use rand::Rng;

/// Coarse subject of a user message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Greeting,
    Temperature,
    Vegetation,
    Water,
    Help,
    Generic,
}

/// Topics checked in order; greetings last since they often open other questions
const TOPIC_KEYWORDS: &[(Topic, &[&str])] = &[
    (
        Topic::Help,
        &["ajuda", "ajudar", "como funciona", "o que você faz", "o que voce faz", "help"],
    ),
    (Topic::Temperature, &["temperatura", "calor", "quente", "lst", "graus"]),
    (
        Topic::Vegetation,
        &["vegetação", "vegetacao", "ndvi", "árvore", "arvore", "floresta", "verde"],
    ),
    (Topic::Water, &["água", "agua", "ndwi", "rio", "alaga", "enchente", "chuva"]),
];

const GREETINGS: &[&str] = &[
    "oi",
    "olá",
    "ola",
    "opa",
    "eai",
    "e aí",
    "bom dia",
    "boa tarde",
    "boa noite",
];

const QUESTION_WORDS: &[&str] = &["quando", "onde", "como", "por que", "quanto", "qual", "quem"];

const GREETING_REPLIES: &[&str] = &[
    "E aí! Sou o Sacy. Desenha uma área no mapa que eu te conto o que os satélites mostram.",
    "Opa, tudo certo? Bora olhar alguma região hoje?",
    "Oi! Tô por aqui. Quer ver temperatura, vegetação ou água de alguma área?",
];

const TEMPERATURE_REPLIES: &[&str] = &[
    "Pra ver a temperatura, carrega a camada LST e escolhe um período. Aí eu te digo onde tá mais quente.",
    "Calor é comigo mesmo! Desenha a área e define as datas que eu olho a temperatura de superfície.",
    "A temperatura vem do Landsat. Seleciona a região e o período que eu te mostro a média.",
];

const VEGETATION_REPLIES: &[&str] = &[
    "Pra vegetação eu uso o NDVI do Sentinel-2. Desenha a área que eu te digo se tá bem verde.",
    "Quer saber da cobertura verde? Carrega a camada NDVI e escolhe um período.",
    "Valores altos de NDVI indicam vegetação densa. Marca a região no mapa que eu dou uma olhada.",
];

const WATER_REPLIES: &[&str] = &[
    "Pra água eu olho o NDWI e o radar do Sentinel-1. Desenha a área e escolhe as datas.",
    "Quer saber se alaga? Define a região e o período que eu confiro os dados de radar.",
    "Rios, lagos e áreas úmidas aparecem bem no NDWI. Marca a área que eu te mostro.",
];

const HELP_REPLIES: &[&str] = &[
    "Eu analiso áreas com imagens de satélite: temperatura (LST), vegetação (NDVI), água (NDWI), radar e elevação. Desenha um polígono no mapa e me pergunta!",
    "Funciona assim: tu marca uma área no mapa, escolhe um período e me pergunta sobre calor, vegetação, água ou alagamento.",
];

const GENERIC_REPLIES: &[&str] = &[
    "Pois não, amigão, conta aí o que tu quer saber que eu te ajudo.",
    "Óia só, vou dar uma olhada nisso pra ti.",
    "Egua! Isso parece interessante, me diz mais um pouco.",
    "Deixa comigo, vou te explicar de maneira simples e rapidinha.",
];

/// Classify a message by substring match
pub fn classify(message: &str) -> Topic {
    let lower = message.to_lowercase();

    if let Some((topic, _)) = TOPIC_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
    {
        return *topic;
    }

    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != ' ')
        .flat_map(str::split_whitespace)
        .collect();
    let joined = words.join(" ");
    let is_greeting = GREETINGS.iter().any(|g| {
        if g.contains(' ') {
            joined.contains(g)
        } else {
            words.contains(g)
        }
    });

    if is_greeting {
        Topic::Greeting
    } else {
        Topic::Generic
    }
}

fn templates(topic: Topic) -> &'static [&'static str] {
    match topic {
        Topic::Greeting => GREETING_REPLIES,
        Topic::Temperature => TEMPERATURE_REPLIES,
        Topic::Vegetation => VEGETATION_REPLIES,
        Topic::Water => WATER_REPLIES,
        Topic::Help => HELP_REPLIES,
        Topic::Generic => GENERIC_REPLIES,
    }
}

/// Pick a canned reply for the message's topic
pub fn fallback_response<R: Rng + ?Sized>(message: &str, rng: &mut R) -> String {
    let topic = classify(message);
    let reply = templates(topic).choose(rng).copied().unwrap_or(GENERIC_REPLIES[0]);

    let lower = message.to_lowercase();
    if topic == Topic::Generic && QUESTION_WORDS.iter().any(|w| lower.contains(w)) {
        let lead = if rng.gen_bool(0.5) { "Respondendo:" } else { "Aqui vai:" };
        return format!("{} {} {}", reply, lead, message.trim());
    }

    reply.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_classify_topics() {
        assert_eq!(classify("Oi, tudo bem?"), Topic::Greeting);
        assert_eq!(classify("bom dia"), Topic::Greeting);
        assert_eq!(classify("tá muito quente aqui"), Topic::Temperature);
        assert_eq!(classify("Como tá a vegetação?"), Topic::Vegetation);
        assert_eq!(classify("essa rua alaga?"), Topic::Water);
        assert_eq!(classify("me ajuda aqui"), Topic::Help);
        assert_eq!(classify("e o trânsito?"), Topic::Generic);
    }

    #[test]
    fn test_greeting_needs_whole_word() {
        // "noite" and "foi" contain "oi" but are not greetings on their own
        assert_eq!(classify("foi ontem"), Topic::Generic);
        assert_eq!(classify("oi"), Topic::Greeting);
    }

    #[test]
    fn test_greetings_use_assistant_name() {
        use crate::chat::{ANALYSIS_INSTRUCTION, ASSISTANT_NAME, CHAT_INSTRUCTION};

        assert!(GREETING_REPLIES.iter().any(|r| r.contains(ASSISTANT_NAME)));
        for instruction in [CHAT_INSTRUCTION, ANALYSIS_INSTRUCTION] {
            assert!(instruction.to_uppercase().contains(&ASSISTANT_NAME.to_uppercase()));
        }
    }

    #[test]
    fn test_topic_wins_over_greeting() {
        assert_eq!(classify("oi, qual a temperatura?"), Topic::Temperature);
    }

    #[test]
    fn test_reply_comes_from_topic_bucket() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let reply = fallback_response("quero ver a vegetação", &mut rng);
            assert!(VEGETATION_REPLIES.contains(&reply.as_str()));
        }
    }

    #[test]
    fn test_generic_question_is_echoed() {
        let mut rng = StepRng::new(0, 0);
        let reply = fallback_response("quem fez esse mapa?", &mut rng);
        assert_eq!(reply, format!("{} Respondendo: quem fez esse mapa?", GENERIC_REPLIES[0]));
    }
}
