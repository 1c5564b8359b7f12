//! Content validation: reject items that are not real news articles.
//!
//! Scraped containers regularly turn out to be error pages, paywall prompts,
//! newsletter boxes, ads or navigation links. The checks below are pure
//! heuristics over the title, link and image of a [`NewsItem`]; each one maps
//! to a [`Rejection`] so callers can log why an item was dropped.

use crate::models::NewsItem;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

const MIN_TITLE_CHARS: usize = 20;
const MIN_TITLE_TOKENS: usize = 4;
const MIN_MEANINGFUL_TOKENS: usize = 3;
const MIN_IMAGE_CHARS: usize = 10;
const MIN_UNIQUE_RATIO: f64 = 0.7;

/// Error, blocking and maintenance vocabulary. Matched on word boundaries.
const ERROR_KEYWORDS: &[&str] = &[
    "erro", "error", "404", "403", "500", "não encontrado", "not found",
    "acesso negado", "access denied", "página não existe", "page not found",
    "falha ao carregar", "failed to load", "conexão perdida", "connection lost",
    "servidor indisponível", "server unavailable", "site em manutenção",
    "maintenance", "temporariamente indisponível", "temporarily unavailable",
    "bloqueado", "blocked", "forbidden", "unauthorized", "não autorizado",
    "cors error", "network error", "timeout", "expired", "expirado",
    "invalid", "inválido", "não permitido", "not allowed",
];

/// Calls to action, paywall and marketing phrases. Matched as substrings.
const INVALID_PHRASES: &[&str] = &[
    "página não encontrada", "page not found", "deu na tv globo", "deu na globo",
    "viu na tv", "viu na globo", "assista ao vivo", "ao vivo", "saiba mais",
    "clique aqui", "leia mais", "confira", "veja mais", "acesse", "cadastre-se",
    "faça login", "newsletter", "inscreva-se", "publicidade", "anúncio",
    "propaganda", "patrocínio", "assine", "assinar", "assinatura",
    "seja assinante", "torne-se assinante", "assine já", "subscribe",
    "subscription", "premium", "plano premium", "acesso premium",
    "sign up", "log in", "read more", "click here", "advertisement", "sponsored",
];

const LINK_ERROR_TOKENS: &[&str] = &["erro", "error", "404", "403", "500"];

/// Words typical of news headlines. Matched as substrings.
const SUBSTANTIVE_WORDS: &[&str] = &[
    "governo", "presidente", "prefeito", "ministro", "secretário",
    "projeto", "lei", "decreto", "medida", "ação", "programa",
    "empresa", "economia", "mercado", "investimento", "negócio",
    "hospital", "saúde", "médico", "tratamento", "vacina",
    "escola", "educação", "universidade", "professor", "aluno",
    "polícia", "crime", "investigação", "operação", "segurança",
    "evento", "festival", "show", "exposição", "feira",
    "obra", "construção", "reforma", "infraestrutura",
    "time", "jogador", "partida", "campeonato", "copa",
    "tecnologia", "internet", "aplicativo", "sistema",
    "government", "president", "mayor", "minister", "law", "company",
    "economy", "market", "investment", "health", "vaccine", "school",
    "university", "police", "investigation", "election", "team",
    "technology", "software",
];

const CONNECTIVES: &[&str] = &[" de ", " em ", " para ", " com ", " por ", " in ", " of ", " for ", " with "];
const PLACE_NAMES: &[&str] = &["bh", "belo horizonte", "minas", "brasil"];

static ERROR_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    let alternatives = ERROR_KEYWORDS.iter().map(|k| regex::escape(k)).collect::<Vec<_>>();
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|"))).unwrap()
});

static NON_NEWS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(?:deu|viu|assista|confira|veja|leia|saiba|clique)\b",
        r"^(?:newsletter|cadastr|login|inscr)",
        r"^(?:publicidad|anúnci|propagand|patrocíni)",
        r"^(?:assine|assinar|subscribe)",
        r"(?:assine|assinatura|subscribe|subscription|premium)",
        r"^\d+\s*$",
        r"^[^\p{L}]+$",
        r"\b(?:javascript|undefined|null|nan)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static DATE_SIGNAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}|\d{1,2}/\d{1,2}").unwrap());

/// Why an item was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    ShortTitle,
    ErrorKeyword,
    InvalidPhrase,
    NonNewsPattern,
    HomepageLink,
    ErrorLink,
    MissingImage,
    RepetitiveTitle,
    NoNewsStructure,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Rejection::ShortTitle => "title too short",
            Rejection::ErrorKeyword => "title reads like an error message",
            Rejection::InvalidPhrase => "title is a call to action or advertisement",
            Rejection::NonNewsPattern => "title does not look like news",
            Rejection::HomepageLink => "link points at the source home page",
            Rejection::ErrorLink => "link looks like an error page",
            Rejection::MissingImage => "image missing",
            Rejection::RepetitiveTitle => "title is repetitive",
            Rejection::NoNewsStructure => "title lacks news structure",
        };
        f.write_str(text)
    }
}

fn check_title_shape(title: &str) -> Option<Rejection> {
    let tokens: Vec<&str> = title.split_whitespace().collect();
    let meaningful = tokens.iter().filter(|t| t.chars().count() > 2).count();
    if title.chars().count() < MIN_TITLE_CHARS
        || tokens.len() < MIN_TITLE_TOKENS
        || meaningful < MIN_MEANINGFUL_TOKENS
    {
        return Some(Rejection::ShortTitle);
    }
    None
}

fn check_title_content(lower: &str) -> Option<Rejection> {
    if ERROR_KEYWORD.is_match(lower) {
        return Some(Rejection::ErrorKeyword);
    }
    if INVALID_PHRASES.iter().any(|p| lower.contains(p)) {
        return Some(Rejection::InvalidPhrase);
    }
    if NON_NEWS_PATTERNS.iter().any(|re| re.is_match(lower)) {
        return Some(Rejection::NonNewsPattern);
    }
    None
}

fn check_link(item: &NewsItem) -> Option<Rejection> {
    let url = item.url.trim();
    let base = item.source_url.trim_end_matches('/');
    if url.is_empty() || url.trim_end_matches('/') == base {
        return Some(Rejection::HomepageLink);
    }
    let lower = url.to_lowercase();
    if LINK_ERROR_TOKENS.iter().any(|t| lower.contains(t)) {
        return Some(Rejection::ErrorLink);
    }
    None
}

fn check_image(item: &NewsItem) -> Option<Rejection> {
    match item.image_url.as_deref().map(str::trim) {
        Some(url) if url.chars().count() >= MIN_IMAGE_CHARS => None,
        _ => Some(Rejection::MissingImage),
    }
}

fn check_repetition(lower: &str) -> Option<Rejection> {
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    if tokens.len() <= 3 {
        return None;
    }
    let unique: HashSet<&str> = tokens.iter().copied().collect();
    if (unique.len() as f64) < tokens.len() as f64 * MIN_UNIQUE_RATIO {
        return Some(Rejection::RepetitiveTitle);
    }
    None
}

fn check_news_structure(lower: &str) -> Option<Rejection> {
    if SUBSTANTIVE_WORDS.iter().any(|w| lower.contains(w)) {
        return None;
    }
    let padded = format!(" {} ", lower);
    let structured = CONNECTIVES.iter().any(|c| padded.contains(c))
        || DATE_SIGNAL.is_match(lower)
        || PLACE_NAMES.iter().any(|p| lower.contains(p));
    if structured {
        None
    } else {
        Some(Rejection::NoNewsStructure)
    }
}

/// The first check `item` fails, or `None` for a displayable article.
pub fn rejection_reason(item: &NewsItem) -> Option<Rejection> {
    let title = item.title.trim();
    let lower = title.to_lowercase();
    check_title_shape(title)
        .or_else(|| check_title_content(&lower))
        .or_else(|| check_link(item))
        .or_else(|| check_image(item))
        .or_else(|| check_repetition(&lower))
        .or_else(|| check_news_structure(&lower))
}

/// True when `item` looks like a real, displayable news article.
pub fn is_valid_article(item: &NewsItem) -> bool {
    rejection_reason(item).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::item;

    #[test]
    fn test_accepts_regular_headline() {
        let news = item("Estado de Minas", "Nova linha do metrô de Belo Horizonte é inaugurada", 1);
        assert_eq!(rejection_reason(&news), None);
        assert!(is_valid_article(&news));
    }

    #[test]
    fn test_rejects_subscription_prompt() {
        let news = item("O Tempo", "Assine já para continuar lendo", 1);
        assert!(!is_valid_article(&news));
        assert_eq!(rejection_reason(&news), Some(Rejection::InvalidPhrase));
    }

    #[test]
    fn test_rejects_short_titles() {
        assert_eq!(
            rejection_reason(&item("G1 Minas", "Chuva em BH", 1)),
            Some(Rejection::ShortTitle)
        );
        assert_eq!(
            rejection_reason(&item("G1 Minas", "Inauguração extraordinariamente comemorada", 1)),
            Some(Rejection::ShortTitle)
        );
    }

    #[test]
    fn test_error_keywords_are_word_bounded() {
        let news = item("G1 Minas", "Ferrovia liga Belo Horizonte ao interior de Minas", 1);
        assert!(is_valid_article(&news));

        let news = item("G1 Minas", "Erro ao carregar a página de notícias da capital", 1);
        assert_eq!(rejection_reason(&news), Some(Rejection::ErrorKeyword));

        let news = item("G1 Minas", "Banco anuncia novo financiamento para casas em Minas", 1);
        assert!(is_valid_article(&news));
    }

    #[test]
    fn test_rejects_marketing_phrases() {
        for title in [
            "Receba a newsletter semanal com novidades de BH",
            "Clique aqui e ganhe descontos em lojas de BH",
            "Read more about the new metro line in town",
        ] {
            assert_eq!(
                rejection_reason(&item("G1 Minas", title, 1)),
                Some(Rejection::InvalidPhrase),
                "{}",
                title
            );
        }
    }

    #[test]
    fn test_rejects_call_to_action_starts() {
        for title in [
            "Veja as fotos do desfile de carnaval em BH",
            "Inscrições abertas para cursos gratuitos na capital",
            "Publicidad digital cresce entre empresas mineiras",
        ] {
            assert_eq!(
                rejection_reason(&item("G1 Minas", title, 1)),
                Some(Rejection::NonNewsPattern),
                "{}",
                title
            );
        }
    }

    #[test]
    fn test_rejects_letterless_titles() {
        let news = item("G1 Minas", "2025 2026 1234 5678 9999", 1);
        assert_eq!(rejection_reason(&news), Some(Rejection::NonNewsPattern));
    }

    #[test]
    fn test_rejects_technical_junk() {
        let news = item("G1 Minas", "Conteúdo undefined carregado na página inicial", 1);
        assert_eq!(rejection_reason(&news), Some(Rejection::NonNewsPattern));

        let news = item("G1 Minas", "Pesquisa de nanotecnologia avança em universidade de Minas", 1);
        assert!(is_valid_article(&news));
    }

    #[test]
    fn test_rejects_bad_links() {
        let mut news = item("G1 Minas", "Prefeitura anuncia obras no Anel Rodoviário", 1);
        news.url = format!("{}/", news.source_url);
        assert_eq!(rejection_reason(&news), Some(Rejection::HomepageLink));

        news.url = String::new();
        assert_eq!(rejection_reason(&news), Some(Rejection::HomepageLink));

        news.url = format!("{}/pagina-404", news.source_url);
        assert_eq!(rejection_reason(&news), Some(Rejection::ErrorLink));
    }

    #[test]
    fn test_rejects_missing_image() {
        let mut news = item("G1 Minas", "Prefeitura anuncia obras no Anel Rodoviário", 1);
        news.image_url = None;
        assert_eq!(rejection_reason(&news), Some(Rejection::MissingImage));
        news.image_url = Some("x.jpg".to_string());
        assert_eq!(rejection_reason(&news), Some(Rejection::MissingImage));
    }

    #[test]
    fn test_rejects_repetitive_title() {
        let news = item("G1 Minas", "Belo Belo Belo Belo Horizonte cresce", 1);
        assert_eq!(rejection_reason(&news), Some(Rejection::RepetitiveTitle));
    }

    #[test]
    fn test_requires_news_structure() {
        let news = item("G1 Minas", "Foguete Alpha decola rumo Marte", 1);
        assert_eq!(rejection_reason(&news), Some(Rejection::NoNewsStructure));

        let news = item("G1 Minas", "Foguete Alpha decola rumo Marte 2025", 1);
        assert!(is_valid_article(&news));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let titles = [
            "Nova linha do metrô de Belo Horizonte é inaugurada",
            "Assine já para continuar lendo",
            "Chuva em BH",
        ];
        for title in titles {
            let news = item("G1 Minas", title, 2);
            let first = is_valid_article(&news);
            assert_eq!(first, is_valid_article(&news));
            assert_eq!(first, is_valid_article(&news.clone()));
        }
    }
}
