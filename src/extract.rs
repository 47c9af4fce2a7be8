//! Request extractors that reject malformed input with the error envelope
//! before any handler code runs. Body and query checks go through
//! `axum_valid`; its rejections are mapped onto [`AppError`].

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Query, Request},
    http::{header, request::Parts, StatusCode},
    Json,
};
use axum_valid::{Valid, ValidRejection, ValidationRejection};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::{Map, Value};
use storage::{ImageFile, MAX_IMAGE_SIZE};
use tracing::{debug, trace};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::error::AppError;

fn rejection(status: StatusCode, body_text: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::Storage(storage::Error::FileTooLarge {
            size: 0,
            max_mb: MAX_IMAGE_SIZE / (1024 * 1024),
        });
    }
    AppError::Validation {
        message: body_text,
        errors: Vec::new(),
    }
}

fn valid_rejection<E>(rejected: ValidRejection<E>, inner: impl FnOnce(E) -> AppError) -> AppError {
    match rejected {
        ValidationRejection::Valid(errors) => AppError::from(errors),
        ValidationRejection::Inner(e) => inner(e),
    }
}

/// JSON body that has passed `validator` checks.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Valid(Json(value)) = Valid::<Json<T>>::from_request(req, state)
            .await
            .map_err(|r| valid_rejection(r, |e| rejection(e.status(), e.body_text())))?;
        Ok(Self(value))
    }
}

/// Query string that has passed `validator` checks.
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Valid(Query(value)) = Valid::<Query<T>>::from_request_parts(parts, state)
            .await
            .map_err(|r| valid_rejection(r, |e| rejection(e.status(), e.body_text())))?;
        Ok(Self(value))
    }
}

/// Path parameters. A value that does not parse (e.g. a malformed UUID) is a
/// `VALIDATION_ERROR`.
pub struct PathParam<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|r| rejection(StatusCode::BAD_REQUEST, r.body_text()))?;
        Ok(Self(value))
    }
}

/// A payload that may arrive as JSON or as `multipart/form-data` carrying
/// one optional image part.
pub trait UploadForm: DeserializeOwned + Validate {
    /// Name of the multipart part that holds the image.
    const FILE_FIELD: &'static str;
    /// Text parts that hold JSON rather than plain strings.
    const JSON_FIELDS: &'static [&'static str];
}

#[derive(Debug)]
pub struct Payload<T> {
    pub data: T,
    pub file: Option<ImageFile>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

fn form_value(name: &str, text: String, json_fields: &[&str]) -> Result<Value, AppError> {
    if text.is_empty() {
        return Ok(Value::Null);
    }
    if json_fields.contains(&name) {
        return serde_json::from_str(&text)
            .map_err(|e| AppError::validation(name, format!("must be valid JSON: {}", e)));
    }
    Ok(Value::String(text))
}

#[async_trait]
impl<T, S> FromRequest<S> for Payload<T>
where
    T: UploadForm,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let ValidatedJson(data) = ValidatedJson::<T>::from_request(req, state).await?;
            return Ok(Self { data, file: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|r| rejection(r.status(), r.body_text()))?;

        let mut fields = Map::new();
        let mut file = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| rejection(e.status(), e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == T::FILE_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| rejection(e.status(), e.body_text()))?;

                // Browsers send an empty part for an untouched file input
                if bytes.is_empty() && file_name.is_empty() {
                    trace!("Skipping empty '{}' part", name);
                    continue;
                }

                debug!("Received file part '{}' ({} bytes)", file_name, bytes.len());
                file = Some(ImageFile {
                    file_name,
                    content_type,
                    bytes,
                });
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| rejection(e.status(), e.body_text()))?;
                let value = form_value(&name, text, T::JSON_FIELDS)?;
                fields.insert(name, value);
            }
        }

        let data: T = serde_json::from_value(Value::Object(fields)).map_err(|e| AppError::Validation {
            message: format!("Invalid form data: {}", e),
            errors: Vec::new(),
        })?;
        data.validate()?;

        Ok(Self { data, file })
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`). Use with `#[serde(default, deserialize_with = ...)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Rejects strings that are empty once surrounding whitespace is removed.
/// Handlers trim before storing, so `length(min = 1)` alone lets `"   "` through.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some(Cow::Borrowed("must not be blank"));
        return Err(error);
    }
    Ok(())
}

/// Page selection shared by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number. Omit to get the whole list.
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: Option<u64>,
    /// Page size, 1 to 100 (default 20)
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u64>,
}

impl PageParams {
    pub const DEFAULT_LIMIT: u64 = 20;

    /// `(page, limit)` when pagination was requested.
    pub fn requested(&self) -> Option<(u64, u64)> {
        self.page
            .map(|page| (page, self.limit.unwrap_or(Self::DEFAULT_LIMIT)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        bio: Option<Option<String>>,
    }

    #[test]
    fn double_option_separates_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.bio, None);

        let null: Patch = serde_json::from_str(r#"{"bio": null}"#).unwrap();
        assert_eq!(null.bio, Some(None));

        let set: Patch = serde_json::from_str(r#"{"bio": "hi"}"#).unwrap();
        assert_eq!(set.bio, Some(Some("hi".to_string())));
    }

    #[test]
    fn form_values() {
        assert_eq!(form_value("name", String::new(), &[]).unwrap(), Value::Null);
        assert_eq!(
            form_value("name", "2077".to_string(), &["age"]).unwrap(),
            Value::String("2077".to_string())
        );
        assert_eq!(form_value("age", "21".to_string(), &["age"]).unwrap(), Value::from(21));
        assert!(form_value("stats", "{oops".to_string(), &["stats"]).is_err());
    }

    #[test]
    fn valid_rejections_map_onto_app_errors() {
        let errors = PageParams {
            page: Some(0),
            limit: None,
        }
        .validate()
        .unwrap_err();
        match valid_rejection::<()>(ValidationRejection::Valid(errors), |_| panic!("not inner")) {
            AppError::Validation { errors, .. } => assert_eq!(errors[0].field, "page"),
            other => panic!("unexpected {other:?}"),
        }

        let too_large = valid_rejection(ValidationRejection::Inner(StatusCode::PAYLOAD_TOO_LARGE), |status| {
            rejection(status, String::new())
        });
        assert!(matches!(too_large, AppError::Storage(storage::Error::FileTooLarge { .. })));
    }

    #[test]
    fn blank_strings_are_rejected() {
        assert!(not_blank("Atlas").is_ok());
        assert!(not_blank("  Atlas ").is_ok());
        assert_eq!(not_blank("").unwrap_err().code, "blank");
        assert_eq!(not_blank(" \t\n ").unwrap_err().code, "blank");
    }

    #[test]
    fn page_params_default_limit() {
        let params = PageParams {
            page: Some(2),
            limit: None,
        };
        assert_eq!(params.requested(), Some((2, 20)));
        assert_eq!(PageParams::default().requested(), None);
    }

    #[test]
    fn page_params_bounds() {
        let params = PageParams {
            page: Some(0),
            limit: Some(101),
        };
        let err = AppError::from(params.validate().unwrap_err());
        match err {
            AppError::Validation { errors, .. } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}
