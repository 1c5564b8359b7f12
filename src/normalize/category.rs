//! Category inference from source hints and headline keywords.

use crate::models::Category;
use once_cell::sync::Lazy;
use regex::Regex;

/// Source-declared hint fragments mapped onto the canonical set, in priority order.
const HINT_RULES: &[(&[&str], Category)] = &[
    (&["esporte", "sport"], Category::Sports),
    (&["política", "politica", "politic"], Category::Politics),
    (&["economia", "econom", "business", "negócio"], Category::Economy),
    (&["cultura", "culture", "entretenimento", "entertainment"], Category::Culture),
    (&["saúde", "saude", "health"], Category::Health),
    (&["tecnologia", "tech", "ciência", "science"], Category::Technology),
    (&["ambiente", "environment", "clima", "climate"], Category::Environment),
];

/// Keyword sets scanned in title+body when no hint matched, in priority order.
/// Matched as whole words, with an optional plural ending.
const KEYWORD_RULES: &[(&[&str], Category)] = &[
    (
        &["metrô", "metro", "ônibus", "onibus", "trânsito", "transito", "transporte", "estrada", "ciclovia", "brt", "rodovia"],
        Category::Transport,
    ),
    (
        &["atlético", "atletico", "cruzeiro", "américa-mg", "futebol", "esporte", "jogo", "campeonato", "gol", "football", "soccer"],
        Category::Sports,
    ),
    (
        &["prefeito", "vereador", "eleição", "eleicao", "político", "politico", "prefeitura", "governo", "câmara", "election", "government"],
        Category::Politics,
    ),
    (
        &["economia", "empresa", "negócio", "investimento", "mercado", "emprego", "renda", "inflação", "economy", "market"],
        Category::Economy,
    ),
    (
        &["cultura", "festival", "arte", "música", "musica", "teatro", "cinema", "show", "exposição"],
        Category::Culture,
    ),
    (
        &["saúde", "saude", "hospital", "médico", "medico", "sus", "vacina", "doença", "tratamento", "health"],
        Category::Health,
    ),
    (
        &["tecnologia", "startup", "inovação", "inovacao", "digital", "internet", "aplicativo", "software", "ai"],
        Category::Technology,
    ),
    (
        &["meio ambiente", "parque", "sustentável", "sustentavel", "ecologia", "natureza", "climate"],
        Category::Environment,
    ),
];

static KEYWORD_PATTERNS: Lazy<Vec<(Regex, Category)>> = Lazy::new(|| {
    KEYWORD_RULES
        .iter()
        .map(|(keywords, category)| {
            let alternatives = keywords.iter().map(|k| regex::escape(k)).collect::<Vec<_>>();
            let pattern = format!(r"(?i)\b(?:{})(?:s|es)?\b", alternatives.join("|"));
            (Regex::new(&pattern).unwrap(), *category)
        })
        .collect()
});

/// Infer the category of an item.
///
/// Source hints win over keywords. Hints match by fragment, keywords as whole
/// words of the title and body. Defaults to [`Category::General`].
pub fn infer_category(title: &str, body: &str, hints: &[String]) -> Category {
    for hint in hints {
        let hint = hint.to_lowercase();
        if let Some((_, category)) = HINT_RULES
            .iter()
            .find(|(fragments, _)| fragments.iter().any(|f| hint.contains(f)))
        {
            return *category;
        }
    }

    let text = format!("{} {}", title, body);
    KEYWORD_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(&text))
        .map(|(_, category)| *category)
        .unwrap_or(Category::General)
}
