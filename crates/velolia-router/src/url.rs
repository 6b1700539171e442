//! URL generation for named routes.

use indexmap::IndexMap;
use serde_json::Value;
use velolia_core::{model::key_string, Model, VeloliaError, VeloliaResult};

use crate::pattern::{normalize_path, tokenize, Placeholder, Token};

/// Values for a route's placeholders.
///
/// | Input | Fills |
/// |---|---|
/// | scalar | the first placeholder (`id` when there is none) |
/// | record | the first placeholder, with the record's route key |
/// | list | placeholders by position |
/// | map | placeholders by name |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UrlParams {
    /// No values.
    #[default]
    None,
    /// One value for the first placeholder.
    Scalar(String),
    /// A record's route key, for the first placeholder.
    Record {
        /// The model's route key column.
        key_name: String,
        /// The record's value for that column.
        key: Option<String>,
    },
    /// Values by position.
    List(Vec<String>),
    /// Values by placeholder name.
    Map(IndexMap<String, String>),
}

impl UrlParams {
    /// The route key of a record.
    pub fn model<M: Model>(model: &M) -> Self {
        Self::Record {
            key_name: M::route_key_name().to_string(),
            key: model.route_key(),
        }
    }

    /// Values by name.
    pub fn map<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        Self::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        )
    }

    /// Resolves the input into values by placeholder name.
    fn by_name(self, placeholders: &[Placeholder]) -> VeloliaResult<IndexMap<String, String>> {
        let first = placeholders.first().map(Placeholder::name);
        Ok(match self {
            Self::None => IndexMap::new(),
            Self::Scalar(value) => IndexMap::from([(first.unwrap_or("id").to_string(), value)]),
            Self::Record { key_name, key } => {
                let name = first.map_or(key_name, str::to_string);
                key.map(|key| IndexMap::from([(name, key)])).unwrap_or_default()
            }
            Self::List(values) => {
                if values.len() > placeholders.len() {
                    return Err(VeloliaError::invalid_argument(format!(
                        "{} values given for {} placeholders",
                        values.len(),
                        placeholders.len()
                    )));
                }
                placeholders
                    .iter()
                    .map(|p| p.name().to_string())
                    .zip(values)
                    .collect()
            }
            Self::Map(values) => values,
        })
    }
}

impl From<()> for UrlParams {
    fn from((): ()) -> Self {
        Self::None
    }
}

impl From<&str> for UrlParams {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for UrlParams {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

macro_rules! scalar_params {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for UrlParams {
                fn from(value: $ty) -> Self {
                    Self::Scalar(value.to_string())
                }
            }
        )*
    };
}

scalar_params!(i32, i64, u32, u64, usize);

impl From<Vec<String>> for UrlParams {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl From<Vec<&str>> for UrlParams {
    fn from(values: Vec<&str>) -> Self {
        Self::List(values.into_iter().map(str::to_string).collect())
    }
}

impl From<IndexMap<String, String>> for UrlParams {
    fn from(values: IndexMap<String, String>) -> Self {
        Self::Map(values)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for UrlParams {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self::map(pairs)
    }
}

impl From<Value> for UrlParams {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::None,
            Value::Array(items) => Self::List(items.iter().filter_map(key_string).collect()),
            Value::Object(fields) => Self::Map(
                fields
                    .iter()
                    .filter_map(|(k, v)| key_string(v).map(|v| (k.clone(), v)))
                    .collect(),
            ),
            scalar => key_string(&scalar).map_or(Self::None, Self::Scalar),
        }
    }
}

/// Substitutes `params` into the route path `path`.
///
/// Values are percent-encoded. Unfilled optional placeholders are removed
/// together with their leading `/`.
pub(crate) fn fill(route: &str, path: &str, params: UrlParams, placeholders: &[Placeholder]) -> VeloliaResult<String> {
    let values = params.by_name(placeholders)?;

    let mut out = String::with_capacity(path.len());
    for token in tokenize(path) {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::Placeholder(placeholder) => match values.get(placeholder.name()) {
                Some(value) => out.push_str(&urlencoding::encode(value)),
                None if placeholder.is_optional() => {}
                None => {
                    return Err(VeloliaError::MissingUrlParameter {
                        route: route.to_string(),
                        name: placeholder.name().to_string(),
                    })
                }
            },
        }
    }
    Ok(normalize_path(&out))
}

/// Joins `path` onto `base` and appends an encoded query string.
pub(crate) fn to_url(base: Option<&str>, path: &str, query: &[(&str, &str)]) -> String {
    let mut url = format!(
        "{}/{}",
        base.unwrap_or_default().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    if !query.is_empty() {
        url.push('?');
        url.push_str(&build_query(query));
    }
    url
}

fn build_query(query: &[(&str, &str)]) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PathPattern;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Serialize, Deserialize)]
    struct Post {
        id: u64,
        slug: String,
    }

    impl Model for Post {
        fn table() -> &'static str {
            "posts"
        }

        fn route_key_name() -> &'static str {
            "slug"
        }
    }

    fn build(path: &str, params: impl Into<UrlParams>) -> VeloliaResult<String> {
        let pattern = PathPattern::compile(path);
        fill("test", path, params.into(), pattern.placeholders())
    }

    #[test]
    fn test_scalar_fills_first_placeholder() {
        assert_eq!(build("/posts/{post}", 42_u64).unwrap(), "/posts/42");
        assert_eq!(build("/users/{user}/posts/{post?}", "7").unwrap(), "/users/7/posts");
    }

    #[test]
    fn test_record_uses_route_key() {
        let post = Post {
            id: 1,
            slug: "hello-world".into(),
        };
        assert_eq!(build("/posts/{post}", UrlParams::model(&post)).unwrap(), "/posts/hello-world");
    }

    #[test]
    fn test_map_and_list() {
        let path = "/orgs/{org}/users/{user}";
        assert_eq!(build(path, [("user", "2"), ("org", "acme")]).unwrap(), "/orgs/acme/users/2");
        assert_eq!(build(path, vec!["acme", "2"]).unwrap(), "/orgs/acme/users/2");
        assert_eq!(build(path, json!({"org": "acme", "user": 2})).unwrap(), "/orgs/acme/users/2");
        assert!(build(path, vec!["a", "b", "c"]).is_err());
    }

    #[test]
    fn test_missing_required_placeholder() {
        let err = build("/orgs/{org}/users/{user}", [("org", "acme")]).unwrap_err();
        assert!(matches!(
            err,
            VeloliaError::MissingUrlParameter { ref name, .. } if name == "user"
        ));
        assert_eq!(err.to_string(), "Missing required parameter [user] for route [test]");
    }

    #[test]
    fn test_values_are_encoded() {
        assert_eq!(build("/search/{term}", "a b/c").unwrap(), "/search/a%20b%2Fc");
    }

    #[test]
    fn test_to_url() {
        assert_eq!(to_url(Some("http://localhost/"), "/posts", &[]), "http://localhost/posts");
        assert_eq!(to_url(None, "posts", &[("page", "2"), ("q", "a b")]), "/posts?page=2&q=a%20b");
    }
}
