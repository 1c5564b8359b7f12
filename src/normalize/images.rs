//! Image URL resolution and stock-image substitution.

use crate::config::ImageUrlRule;
use crate::models::Category;
use tracing::debug;

/// Fragments that mark an image as a placeholder rather than real artwork.
const PLACEHOLDER_MARKERS: &[&str] = &["placeholder", "default", "loading", ".svg", "1x1", "pixel"];

const STOCK_SUFFIX: &str = "?w=800&h=400&fit=crop&q=80";

/// Content keywords mapped to a fitting stock photo, most specific first.
const KEYWORD_IMAGES: &[(&[&str], &str)] = &[
    (&["prefeito", "prefeitura", "câmara", "vereador"], "photo-1529107386315-e1a2ed48a620"),
    (&["eleição", "eleições", "candidato", "voto"], "photo-1495571758719-6ec1e8a6e2e7"),
    (&["atlético", "cruzeiro", "américa", "futebol", "estádio"], "photo-1461896836934-ffe607ba8211"),
    (&["copa", "campeonato", "jogador", "time"], "photo-1574629810360-7efbbe195018"),
    (&["ônibus", "brt", "move", "transporte", "linha", "metrô"], "photo-1544620347-c4fd4a3d5957"),
    (&["trânsito", "tráfego", "avenida", "congestionamento"], "photo-1449824913935-59a10b8d2000"),
    (&["obra", "viaduto", "construção", "infraestrutura"], "photo-1581094288338-2314dddb7ece"),
    (&["mercado", "economia", "pib", "crescimento"], "photo-1590283603385-17ffb3a7f29f"),
    (&["emprego", "trabalho", "vagas"], "photo-1507003211169-0a1dd7228f2d"),
    (&["hospital", "saúde", "médico", "sus", "tratamento"], "photo-1559757148-5c350d0d3c56"),
    (&["vacina", "vacinação", "imunização"], "photo-1584017911766-d451b3d0e843"),
    (&["escola", "educação", "universidade", "ufmg"], "photo-1523050854058-8df90110c9f1"),
    (&["festival", "show", "música", "arte", "cultura"], "photo-1518562180175-34a163b1a9a6"),
    (&["cinema", "filme", "teatro"], "photo-1489599856225-2b16f04d57b6"),
    (&["tecnologia", "5g", "internet", "digital"], "photo-1518709268805-4e9042af2176"),
    (&["polícia", "segurança", "crime", "violência"], "photo-1515187029135-18ee286d815b"),
    (&["meio ambiente", "sustentabilidade", "verde", "parque"], "photo-1441974231531-c6227db76b6e"),
    (&["restaurante", "comida", "gastronomia", "culinária"], "photo-1414235077428-338989a2e8c0"),
    (&["turismo", "viagem", "hotel", "patrimônio"], "photo-1488646953014-85cb44e25828"),
];

fn stock_url(photo: &str) -> String {
    format!("https://images.unsplash.com/{}{}", photo, STOCK_SUFFIX)
}

fn category_photo(category: Category) -> &'static str {
    match category {
        Category::Sports => "photo-1461896836934-ffe607ba8211",
        Category::Politics => "photo-1529107386315-e1a2ed48a620",
        Category::Economy => "photo-1590283603385-17ffb3a7f29f",
        Category::Culture => "photo-1518562180175-34a163b1a9a6",
        Category::Technology => "photo-1518709268805-4e9042af2176",
        Category::Health => "photo-1559757148-5c350d0d3c56",
        Category::Transport => "photo-1544620347-c4fd4a3d5957",
        Category::Environment => "photo-1441974231531-c6227db76b6e",
        Category::General => "photo-1504711434969-e33886168f5c",
    }
}

/// Turn a raw `src` attribute into an absolute URL according to `rule`.
///
/// Returns `None` for blank input.
pub fn resolve_image_url(src: &str, base_url: &str, rule: ImageUrlRule) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    match rule {
        ImageUrlRule::AsIs => Some(src.to_string()),
        ImageUrlRule::Resolve => Some(resolve_link(src, base_url)),
    }
}

/// Resolve a possibly relative reference against a source's base URL.
///
/// `//host/x` gets `https:`, `/x` is appended to the base, absolute URLs pass
/// through and anything else is joined to the base with a `/`.
pub fn resolve_link(href: &str, base_url: &str) -> String {
    let href = href.trim();
    let base = base_url.trim_end_matches('/');
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else if href.starts_with('/') {
        format!("{}{}", base, href)
    } else {
        format!("{}/{}", base, href)
    }
}

/// Drop everything from the first `?` on. Image CDNs put resize parameters there.
pub fn strip_query(url: &str) -> &str {
    url.split_once('?').map(|(head, _)| head).unwrap_or(url)
}

pub fn is_placeholder(url: &str) -> bool {
    let lower = url.to_lowercase();
    PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m))
}

/// Pick a stock photo for an item that came without artwork.
///
/// Content keywords are checked first; the category photo is the fallback.
pub fn stock_image(title: &str, summary: &str, category: Category) -> String {
    let text = format!("{} {}", title, summary).to_lowercase();
    for (keywords, photo) in KEYWORD_IMAGES {
        if let Some(keyword) = keywords.iter().find(|k| text.contains(*k)) {
            debug!(keyword, "Stock image chosen by keyword");
            return stock_url(photo);
        }
    }
    stock_url(category_photo(category))
}
