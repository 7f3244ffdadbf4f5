//! Community feed: posts and vehicle ads.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use entregas_types::{CommunityFeed, Post, VehicleAd};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use super::{ensure_valid, or_empty};
use crate::errors::{ApiError, ApiResult};
use crate::http::ApiClient;
use crate::validation::FieldErrors;

const POSTS_PATH: &str = "/comunidade/api/postagens/";
const ADS_PATH: &str = "/comunidade/api/anuncios/";
const SUBMIT_PATH: &str = "/comunidade/";
const DEFAULT_PHOTO_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub posts: Vec<Post>,
    pub ads: Vec<VehicleAd>,
    pub failed: Vec<&'static str>,
}

#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub author: String,
    pub title: String,
    pub content: String,
}

impl PostDraft {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.title.trim().is_empty() {
            errors.insert("titulo", "Title is required");
        }
        if self.content.trim().is_empty() {
            errors.insert("conteudo", "Content is required");
        }
        errors
    }

    fn into_form(self) -> Form {
        let author = match self.author.trim() {
            "" => "Usuário".to_string(),
            a => a.to_string(),
        };
        Form::new()
            .text("autor", author)
            .text("titulo", self.title.trim().to_string())
            .text("conteudo", self.content.trim().to_string())
            .text("submit_postagem", "true")
    }
}

/// Image attached to an ad as the `foto` part.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Reads an image file; the MIME type comes from the extension.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self> {
        let path = normalize_input_path(path);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("read photo {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("foto.jpg")
            .to_string();
        Ok(Self {
            mime: mime_type_for_extension(&path).unwrap_or(DEFAULT_PHOTO_MIME),
            file_name,
            bytes,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdDraft {
    pub model: String,
    pub year: u32,
    pub mileage: u32,
    pub price: f64,
    pub location: String,
    pub external_link: Option<String>,
    pub photo: Option<PhotoUpload>,
}

impl AdDraft {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.model.trim().is_empty() {
            errors.insert("modelo", "Model is required");
        }
        if !(1900..=2100).contains(&self.year) {
            errors.insert("ano", "Year is out of range");
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            errors.insert("preco", "Price must be greater than zero");
        }
        if self.location.trim().is_empty() {
            errors.insert("localizacao", "Location is required");
        }
        if let Some(link) = self.external_link.as_deref().filter(|l| !l.trim().is_empty())
            && url::Url::parse(link.trim()).is_err()
        {
            errors.insert("link_externo", "Link must be a full URL");
        }
        errors
    }

    fn into_form(self) -> ApiResult<Form> {
        let mut form = Form::new()
            .text("modelo", self.model.trim().to_string())
            .text("ano", self.year.to_string())
            .text("quilometragem", self.mileage.to_string())
            .text("preco", format!("{:.2}", self.price))
            .text("localizacao", self.location.trim().to_string())
            .text(
                "link_externo",
                self.external_link.unwrap_or_default().trim().to_string(),
            )
            .text("submit_anuncio", "true");
        if let Some(photo) = self.photo {
            let part = Part::bytes(photo.bytes)
                .file_name(photo.file_name)
                .mime_str(photo.mime)
                .map_err(|e| ApiError::parse(format!("Invalid photo type: {e}")))?;
            form = form.part("foto", part);
        }
        Ok(form)
    }
}

impl ApiClient {
    pub async fn list_posts(&self) -> ApiResult<Vec<Post>> {
        let feed: CommunityFeed = self.get(POSTS_PATH).await?;
        Ok(feed.posts)
    }

    pub async fn list_ads(&self) -> ApiResult<Vec<VehicleAd>> {
        let feed: CommunityFeed = self.get(ADS_PATH).await?;
        Ok(feed.ads)
    }

    /// Posts and ads fetched concurrently; a failed source shows empty.
    pub async fn feed(&self) -> Feed {
        let (posts, ads) = tokio::join!(self.list_posts(), self.list_ads());
        let (posts, posts_failed) = or_empty("posts", posts);
        let (ads, ads_failed) = or_empty("ads", ads);
        Feed {
            posts,
            ads,
            failed: posts_failed.into_iter().chain(ads_failed).collect(),
        }
    }

    /// Submits a post. New posts await moderation before appearing in the
    /// feed.
    pub async fn create_post(&self, draft: PostDraft) -> ApiResult<Post> {
        ensure_valid(&draft.validate())?;
        let raw: Value = self.post_multipart(SUBMIT_PATH, draft.into_form()).await?;
        submitted(raw, "postagem")
    }

    pub async fn create_ad(&self, draft: AdDraft) -> ApiResult<VehicleAd> {
        ensure_valid(&draft.validate())?;
        let form = draft.into_form()?;
        let raw: Value = self.post_multipart(SUBMIT_PATH, form).await?;
        submitted(raw, "anuncio")
    }
}

/// `{success, message, <key>: {...}}`; `success: false` is a failure even
/// with a 2xx status.
fn submitted<T: serde::de::DeserializeOwned>(raw: Value, key: &str) -> ApiResult<T> {
    if raw.get("success").and_then(Value::as_bool) == Some(false) {
        let mut err = ApiError::http_status(400, Some(raw));
        err.status = None;
        return Err(err);
    }
    let item = raw.get(key).cloned().unwrap_or(raw);
    serde_json::from_value(item).map_err(|e| ApiError::parse(format!("Unexpected {key}: {e}")))
}

/// Unescapes drag-and-drop shell escapes and expands `~/`.
fn normalize_input_path(path: &Path) -> PathBuf {
    let Some(raw) = path.to_str() else {
        return path.to_path_buf();
    };
    let unescaped = raw
        .replace("\\ ", " ")
        .replace("\\(", "(")
        .replace("\\)", ")");
    if let Some(rest) = unescaped.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(unescaped)
}

fn mime_type_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|e| e.to_str())?;
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::errors::ApiErrorKind;
    use crate::store::TokenStore;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), Duration::from_secs(5), TokenStore::in_memory()).unwrap()
    }

    #[tokio::test]
    async fn test_feed_joins_posts_and_ads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(POSTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "postagens": [{"id": 1, "autor": "joao", "titulo": "Dica", "conteudo": "Evite a marginal"}],
                "anuncios": []
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(ADS_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let feed = client(&server).feed().await;
        assert_eq!(feed.posts.len(), 1);
        assert!(feed.ads.is_empty());
        assert_eq!(feed.failed, vec!["ads"]);
    }

    #[tokio::test]
    async fn test_create_post_is_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SUBMIT_PATH))
            .and(body_string_contains("submit_postagem"))
            .and(body_string_contains("Evite a marginal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Postagem criada com sucesso!",
                "postagem": {"id": 5, "autor": "Ana", "titulo": "Dica", "conteudo": "Evite a marginal"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let post = client(&server)
            .create_post(PostDraft {
                author: "Ana".into(),
                title: "Dica".into(),
                content: "Evite a marginal".into(),
            })
            .await
            .unwrap();
        assert_eq!(post.id, Some(5));
    }

    #[tokio::test]
    async fn test_create_ad_with_photo() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SUBMIT_PATH))
            .and(body_string_contains("submit_anuncio"))
            .and(body_string_contains("filename=\"moto.png\""))
            .and(body_string_contains("fake png bytes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "anuncio": {"id": 8, "modelo": "Fan 150", "ano": 2019, "quilometragem": 30000,
                            "preco": 9500.0, "localizacao": "Recife"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let photo_path = dir.path().join("moto.png");
        std::fs::write(&photo_path, b"fake png bytes").unwrap();
        let photo = PhotoUpload::from_path(&photo_path).unwrap();
        assert_eq!(photo.mime, "image/png");

        let ad = client(&server)
            .create_ad(AdDraft {
                model: "Fan 150".into(),
                year: 2019,
                mileage: 30000,
                price: 9500.0,
                location: "Recife".into(),
                external_link: None,
                photo: Some(photo),
            })
            .await
            .unwrap();
        assert_eq!(ad.id, Some(8));
    }

    #[tokio::test]
    async fn test_rejected_submission_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SUBMIT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false, "message": "Campos obrigatórios faltando"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_ad(AdDraft {
                model: "Fan".into(),
                year: 2019,
                price: 1.0,
                location: "Recife".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Validation);
        assert_eq!(err.user_message(), "Campos obrigatórios faltando");
    }

    #[test]
    fn test_ad_validation() {
        let errors = AdDraft {
            external_link: Some("not a url".into()),
            ..Default::default()
        }
        .validate();
        for field in ["modelo", "ano", "preco", "localizacao", "link_externo"] {
            assert!(errors.get(field).is_some(), "{field}");
        }
    }

    #[test]
    fn test_mime_type_for_extension() {
        assert_eq!(mime_type_for_extension(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(mime_type_for_extension(Path::new("a.heic")), None);
    }

    #[test]
    fn test_normalize_input_path_unescapes() {
        assert_eq!(
            normalize_input_path(Path::new("/tmp/my\\ photo.jpg")),
            PathBuf::from("/tmp/my photo.jpg")
        );
    }
}
