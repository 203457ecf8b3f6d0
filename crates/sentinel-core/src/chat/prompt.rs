//! Prompt composition for the environmental assistant

use crate::models::{Coordinate, DateRange};

/// Name the assistant introduces itself by
pub const ASSISTANT_NAME: &str = "Sacy";

/// Persona and conversation rules for free chat
pub const CHAT_INSTRUCTION: &str = "\
Você é SACY, o copiloto ambiental paraense: um assistente amigável especializado em análise geoespacial.

PERSONALIDADE:
- Jovem, descontraído e naturalmente paraense
- Usa gírias paraenses com naturalidade (1-2 por resposta), como \"égua\", \"de rocha\", \"maninho\", \"ulha\"
- Tem senso de humor leve quando cabe

ESTILO:
- Respostas curtas e diretas (2-4 linhas), longas só para análises técnicas
- Emojis com moderação
- Faça perguntas quando faltar informação, por exemplo se não há área desenhada ou período definido
- Explique termos técnicos de forma simples

CONHECIMENTO:
- Satélites: Sentinel-2, Landsat 8/9, Sentinel-1 (radar)
- Índices: NDVI (vegetação), NDWI (água), LST (temperatura), UHI (ilha de calor), DEM (elevação)
- Dados sociais: setores censitários, comunidades, favelas
- Contexto amazônico e paraense

REGRAS:
- NUNCA mencione \"ferramentas\", \"executei\", \"analisei com\" ou \"usei\"; fale como se você mesmo tivesse visto os dados
- Respeite a vulnerabilidade social das comunidades
- Se não souber, seja honesto
- Use markdown (**negrito**, listas) para organizar";

/// Output format for a one-shot region analysis
pub const ANALYSIS_INSTRUCTION: &str = "\
Você é SACY, analista geoespacial da Amazônia. Recebe indicadores médios de satélite de uma área e produz um relatório em português.

FORMATO:
1. **Resumo**: duas ou três frases sobre a situação geral da área
2. **Vegetação (NDVI)**: interpretação do valor e cor esperada no mapa (tons de verde indicam vegetação densa, branco indica solo exposto ou área urbana)
3. **Água (NDWI)**: interpretação e cor esperada (azul para água, vermelho para áreas secas)
4. **Temperatura (LST)**: interpretação e cor esperada (azul frio, vermelho quente)
5. **Riscos e recomendações**: lista objetiva considerando o contexto informado pelo usuário

Seja preciso com os números recebidos e não invente dados que não foram fornecidos.";

/// Build the full chat prompt: persona, loaded-context summary, then the user turn
pub fn chat_prompt(context_summary: &str, message: &str) -> String {
    format!(
        "{}\n\n**CONTEXTO ATUAL:**\n{}\n\n---\n**USUÁRIO:**\n{}\n",
        CHAT_INSTRUCTION, context_summary, message
    )
}

/// Everything a region analysis prompt reports
#[derive(Debug, Clone, PartialEq)]
pub struct RegionBrief<'a> {
    pub municipality: Option<&'a str>,
    pub center: Coordinate,
    pub vertex_count: usize,
    pub period: DateRange,
    pub satellite_source: &'a str,
    pub ndvi_mean: f64,
    pub ndwi_mean: f64,
    pub lst_mean_celsius: f64,
    pub user_context: &'a str,
}

/// Build the user turn for a region analysis
pub fn region_prompt(brief: &RegionBrief<'_>) -> String {
    let location = brief
        .municipality
        .map(|m| format!("📍 **Município Identificado:** {}\n", m))
        .unwrap_or_default();

    format!(
        "**DADOS PARA ANÁLISE PROFUNDA:**

📍 **Localização:**
{location}- Centro Aproximado: Lat {lat:.4}, Lng {lng:.4}
- Área definida por {points} pontos

📅 **Período de Análise:**
- De: {start}
- Até: {end}

🛰️ **Fonte dos Dados:**
- {source}

📊 **INDICADORES EXTRAÍDOS (Valores Médios):**
- **NDVI (Índice de Vegetação):** `{ndvi:.4}`
- **NDWI (Índice de Água):** `{ndwi:.4}`
- **LST (Temperatura da Superfície):** `{lst:.2} °C`

🎯 **Contexto da Análise Fornecido pelo Usuário:**
{context}

---
Realize a análise seguindo rigorosamente o formato definido e mencione as cores esperadas nas imagens para cada índice.
",
        location = location,
        lat = brief.center.lat,
        lng = brief.center.lng,
        points = brief.vertex_count,
        start = brief.period.start_str(),
        end = brief.period.end_str(),
        source = brief.satellite_source,
        ndvi = brief.ndvi_mean,
        ndwi = brief.ndwi_mean,
        lst = brief.lst_mean_celsius,
        context = brief.user_context,
    )
}
