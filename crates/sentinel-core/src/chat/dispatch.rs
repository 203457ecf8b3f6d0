//! Keyword routing from chat messages to data lookups
//!
//! The routing table is plain data: each route names the capability it
//! triggers, the keywords that trigger it, the context it needs and the
//! layers it accepts. A route whose required context is missing simply does
//! not fire; the model is then expected to ask the user for it.

use std::fmt::Write as _;

use crate::models::{
    ChatContext, FeatureSummary, HeatIslandSummary, ImageListing, LayerStatistics, LayerType,
    SarSummary, WaterSummary,
};

/// Data lookups the assistant can run before answering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ListImages,
    CalculateStatistics,
    AnalyzeGeojson,
    AnalyzeSar,
    UrbanHeatIsland,
    WaterBodies,
}

/// Context a route depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextField {
    Polygon,
    StartDate,
    EndDate,
    Geojson,
    /// A layer resolved from the message itself
    Layer,
}

#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub capability: Capability,
    pub keywords: &'static [&'static str],
    pub requires: &'static [ContextField],
    pub layers: &'static [LayerType],
}

use self::ContextField::{EndDate, Geojson, Layer, Polygon as Area, StartDate};

pub const ROUTES: &[Route] = &[
    Route {
        capability: Capability::ListImages,
        keywords: &[
            "imagem",
            "lst",
            "ndvi",
            "ndwi",
            "menos nuvens",
            "lista",
            "disponível",
            "disponivel",
        ],
        requires: &[Area, Layer, StartDate, EndDate],
        layers: &[LayerType::Lst, LayerType::Ndvi, LayerType::Ndwi],
    },
    Route {
        capability: Capability::AnalyzeGeojson,
        keywords: &[
            "municípios",
            "municipios",
            "favelas",
            "comunidades",
            "setores",
            "quantas",
            "quantos",
            "bairros",
        ],
        requires: &[Geojson],
        layers: &[],
    },
    Route {
        capability: Capability::CalculateStatistics,
        keywords: &[
            "temperatura média",
            "media",
            "média",
            "estatística",
            "estatistica",
            "mais intensa",
            "mais quente",
            "mais frio",
        ],
        requires: &[Area, Layer, StartDate, EndDate],
        layers: &[LayerType::Lst, LayerType::Ndvi],
    },
    Route {
        capability: Capability::AnalyzeSar,
        keywords: &[
            "sar",
            "radar",
            "sentinel-1",
            "inundação",
            "inundacao",
            "alaga",
            "enchente",
            "alagamento",
        ],
        requires: &[Area, StartDate, EndDate],
        layers: &[],
    },
    Route {
        capability: Capability::UrbanHeatIsland,
        keywords: &["ilha de calor", "uhi", "calor urbano", "urbana"],
        requires: &[Area, StartDate],
        layers: &[],
    },
    Route {
        capability: Capability::WaterBodies,
        keywords: &["água", "agua", "rio", "lago", "córrego", "corrego", "umidade", "úmida"],
        requires: &[Area, StartDate],
        layers: &[],
    },
];

/// Layer hints, first match wins
pub const LAYER_HINTS: &[(LayerType, &[&str])] = &[
    (LayerType::Lst, &["lst", "temperatura", "calor"]),
    (LayerType::Ndvi, &["ndvi", "vegetação", "vegetacao"]),
    (LayerType::Ndwi, &["ndwi", "água", "agua"]),
];

/// A capability selected for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub capability: Capability,
    pub layer: Option<LayerType>,
}

impl ContextField {
    fn is_present(&self, ctx: &ChatContext, layer: Option<LayerType>) -> bool {
        match self {
            ContextField::Polygon => ctx.polygon.is_some(),
            ContextField::StartDate => ctx.start_date.is_some(),
            ContextField::EndDate => ctx.end_date.is_some(),
            ContextField::Geojson => ctx.geojson.is_some(),
            ContextField::Layer => layer.is_some(),
        }
    }
}

/// First hinted layer among `allowed` mentioned in an already lowercased message
pub fn resolve_layer(message_lower: &str, allowed: &[LayerType]) -> Option<LayerType> {
    LAYER_HINTS
        .iter()
        .filter(|(layer, _)| allowed.contains(layer))
        .find(|(_, hints)| hints.iter().any(|h| message_lower.contains(h)))
        .map(|(layer, _)| *layer)
}

/// Select every route whose keywords match and whose context is satisfied
pub fn dispatch(message: &str, ctx: &ChatContext) -> Vec<Invocation> {
    let lower = message.to_lowercase();

    ROUTES
        .iter()
        .filter(|route| route.keywords.iter().any(|k| lower.contains(k)))
        .filter_map(|route| {
            let layer = resolve_layer(&lower, route.layers);
            route
                .requires
                .iter()
                .all(|field| field.is_present(ctx, layer))
                .then_some(Invocation {
                    capability: route.capability,
                    layer,
                })
        })
        .collect()
}

/// Result of running one invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Images { layer: LayerType, listing: ImageListing },
    Statistics(LayerStatistics),
    Features(FeatureSummary),
    Sar(SarSummary),
    HeatIsland(HeatIslandSummary),
    Water(WaterSummary),
}

impl ToolOutcome {
    fn render_into(&self, out: &mut String) {
        // Writing to a String cannot fail
        let _ = match self {
            ToolOutcome::Images { layer, listing } => {
                let _ = write!(out, "\nCamada {}: ", layer);
                match listing.best() {
                    Some(best) => write!(out, "melhor imagem em {}, ", best.date),
                    None => Ok(()),
                }
            }
            ToolOutcome::Statistics(stats) => {
                let _ = write!(out, "\nCamada {}: ", stats.layer_type);
                match stats.mean {
                    Some(mean) => write!(out, "média de {:.2}{}, ", mean, stats.unit),
                    None => Ok(()),
                }
            }
            ToolOutcome::Sar(sar) => write!(out, "\nDados de radar: {}", sar.interpretation()),
            ToolOutcome::HeatIsland(uhi) => {
                write!(out, "\nIlha de calor: {:.1}°C ({})", uhi.intensity(), uhi.classification())
            }
            ToolOutcome::Water(water) => write!(out, "\nÁgua: {}", water.interpretation()),
            ToolOutcome::Features(summary) => {
                write!(out, "\nEncontradas {} features", summary.total_features)
            }
        };
    }
}

/// Render outcomes as a data block that never mentions how it was obtained
pub fn render_data_block(outcomes: &[ToolOutcome]) -> String {
    let mut block = String::from("\n\n**DADOS ENCONTRADOS:**\n");
    for outcome in outcomes {
        outcome.render_into(&mut block);
    }
    block
}

const DATA_BLOCK_INSTRUCTION: &str = "Responda à pergunta usando esses dados de forma natural e clara, \
SEM mencionar ferramentas ou processos técnicos.";

/// Append found data to the user's message; unchanged when nothing was found
pub fn enrich_message(message: &str, outcomes: &[ToolOutcome]) -> String {
    if outcomes.is_empty() {
        return message.to_string();
    }

    format!(
        "{}\n\n{}\n\n{}\n",
        message,
        render_data_block(outcomes),
        DATA_BLOCK_INSTRUCTION
    )
}
