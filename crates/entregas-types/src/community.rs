use serde::{Deserialize, Serialize};

use crate::de;

/// Community post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "autor", default)]
    pub author: String,
    #[serde(rename = "titulo", default)]
    pub title: String,
    #[serde(rename = "conteudo", default)]
    pub content: String,
    #[serde(rename = "data_criacao", default)]
    pub created_at: Option<String>,
    #[serde(rename = "curtidas", default)]
    pub likes: u32,
    #[serde(rename = "comentarios", default)]
    pub comments: u32,
}

/// Vehicle-for-sale advertisement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleAd {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "modelo", default)]
    pub model: String,
    #[serde(rename = "ano", default)]
    pub year: u32,
    #[serde(rename = "quilometragem", default)]
    pub mileage: u32,
    #[serde(rename = "preco", default, deserialize_with = "de::decimal")]
    pub price: f64,
    #[serde(rename = "localizacao", default)]
    pub location: String,
    #[serde(rename = "link_externo", default)]
    pub external_link: Option<String>,
    #[serde(rename = "foto", default)]
    pub photo: Option<String>,
    #[serde(rename = "data_publicacao", default)]
    pub published_at: Option<String>,
    #[serde(rename = "vendedor", default)]
    pub seller: Option<String>,
}

/// `{ success, postagens, anuncios }` envelope shared by both community
/// list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommunityFeed {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(rename = "postagens", default)]
    pub posts: Vec<Post>,
    #[serde(rename = "anuncios", default)]
    pub ads: Vec<VehicleAd>,
}
