//! Client-side routes of the admin and ask surfaces.

use std::fmt;

use crate::error::RouteError;

/// Route parameters the state store publishes, raw as they appear in a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    pub deployment_id: Option<String>,
    pub catalog_id: Option<String>,
    pub dataset_id: Option<String>,
    pub resource_idx: Option<String>,
}

/// A resource index is a non-negative integer; anything else is absent.
pub fn parse_resource_index(raw: Option<&str>) -> Option<usize> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse().ok())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminRoute {
    Home,
    Login,
    Deployment { deployment: String },
    Catalogs { deployment: String },
    Websites { deployment: String },
    Questions { deployment: String },
    Datasets { deployment: String, catalog: String },
    Dataset { deployment: String, catalog: String, dataset: String },
    Resource {
        deployment: String,
        catalog: String,
        dataset: String,
        /// Raw segment; see [`parse_resource_index`].
        index: String,
    },
}

fn decode(segment: &str) -> Result<String, RouteError> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|_| RouteError::InvalidSegment(segment.to_string()))
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Splits a path into decoded segments. Empty segments are dropped.
fn segments(path: &str) -> Result<Vec<String>, RouteError> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(decode)
        .collect()
}

impl AdminRoute {
    pub fn parse(path: &str) -> Result<Self, RouteError> {
        let parts = segments(path)?;
        let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
        let route = match parts.as_slice() {
            [] => Self::Home,
            ["login"] => Self::Login,
            ["deployment", d] => Self::Deployment {
                deployment: d.to_string(),
            },
            ["deployment", d, "catalogs"] => Self::Catalogs {
                deployment: d.to_string(),
            },
            ["deployment", d, "websites"] => Self::Websites {
                deployment: d.to_string(),
            },
            ["deployment", d, "questions"] => Self::Questions {
                deployment: d.to_string(),
            },
            ["deployment", d, "catalog", c, "datasets"] => Self::Datasets {
                deployment: d.to_string(),
                catalog: c.to_string(),
            },
            ["deployment", d, "catalog", c, "dataset", ds] => Self::Dataset {
                deployment: d.to_string(),
                catalog: c.to_string(),
                dataset: ds.to_string(),
            },
            ["deployment", d, "catalog", c, "dataset", ds, idx] => Self::Resource {
                deployment: d.to_string(),
                catalog: c.to_string(),
                dataset: ds.to_string(),
                index: idx.to_string(),
            },
            _ => return Err(RouteError::Unknown(parts.join("/"))),
        };
        Ok(route)
    }

    pub fn params(&self) -> RouteParams {
        let mut params = RouteParams::default();
        match self {
            Self::Home | Self::Login => {}
            Self::Deployment { deployment }
            | Self::Catalogs { deployment }
            | Self::Websites { deployment }
            | Self::Questions { deployment } => {
                params.deployment_id = Some(deployment.clone());
            }
            Self::Datasets {
                deployment,
                catalog,
            } => {
                params.deployment_id = Some(deployment.clone());
                params.catalog_id = Some(catalog.clone());
            }
            Self::Dataset {
                deployment,
                catalog,
                dataset,
            } => {
                params.deployment_id = Some(deployment.clone());
                params.catalog_id = Some(catalog.clone());
                params.dataset_id = Some(dataset.clone());
            }
            Self::Resource {
                deployment,
                catalog,
                dataset,
                index,
            } => {
                params.deployment_id = Some(deployment.clone());
                params.catalog_id = Some(catalog.clone());
                params.dataset_id = Some(dataset.clone());
                params.resource_idx = Some(index.clone());
            }
        }
        params
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Self::Login)
    }
}

impl fmt::Display for AdminRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => write!(f, "/"),
            Self::Login => write!(f, "/login"),
            Self::Deployment { deployment } => write!(f, "/deployment/{}", encode(deployment)),
            Self::Catalogs { deployment } => {
                write!(f, "/deployment/{}/catalogs", encode(deployment))
            }
            Self::Websites { deployment } => {
                write!(f, "/deployment/{}/websites", encode(deployment))
            }
            Self::Questions { deployment } => {
                write!(f, "/deployment/{}/questions", encode(deployment))
            }
            Self::Datasets {
                deployment,
                catalog,
            } => write!(
                f,
                "/deployment/{}/catalog/{}/datasets",
                encode(deployment),
                encode(catalog)
            ),
            Self::Dataset {
                deployment,
                catalog,
                dataset,
            } => write!(
                f,
                "/deployment/{}/catalog/{}/dataset/{}",
                encode(deployment),
                encode(catalog),
                encode(dataset)
            ),
            Self::Resource {
                deployment,
                catalog,
                dataset,
                index,
            } => write!(
                f,
                "/deployment/{}/catalog/{}/dataset/{}/{}",
                encode(deployment),
                encode(catalog),
                encode(dataset),
                encode(index)
            ),
        }
    }
}

/// Which ask front end is showing: the desktop page or the mobile embed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Surface {
    #[default]
    Desktop,
    Mobile,
}

impl Surface {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Desktop => "",
            Self::Mobile => "/m",
        }
    }
}

/// `/{deployment}`, `/{deployment}/a/{id}` and their `/m/` variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskRoute {
    pub surface: Surface,
    pub deployment: String,
    pub answer_id: Option<String>,
}

impl AskRoute {
    pub fn new(surface: Surface, deployment: impl Into<String>) -> Self {
        Self {
            surface,
            deployment: deployment.into(),
            answer_id: None,
        }
    }

    pub fn with_answer(mut self, answer_id: impl Into<String>) -> Self {
        self.answer_id = Some(answer_id.into());
        self
    }

    pub fn parse(path: &str) -> Result<Self, RouteError> {
        let parts = segments(path)?;
        let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
        let (surface, deployment, answer_id) = match parts.as_slice() {
            ["m", d, "a", id] => (Surface::Mobile, d, Some(id)),
            ["m", d] => (Surface::Mobile, d, None),
            [d, "a", id] => (Surface::Desktop, d, Some(id)),
            [d] => (Surface::Desktop, d, None),
            _ => return Err(RouteError::Unknown(parts.join("/"))),
        };
        Ok(Self {
            surface,
            deployment: deployment.to_string(),
            answer_id: answer_id.map(|id| id.to_string()),
        })
    }

    pub fn base_path(&self) -> String {
        format!("{}/{}", self.surface.prefix(), encode(&self.deployment))
    }

    pub fn answer_path(&self, answer_id: &str) -> String {
        format!("{}/a/{}", self.base_path(), encode(answer_id))
    }
}

impl fmt::Display for AskRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.answer_id {
            Some(id) => f.write_str(&self.answer_path(id)),
            None => f.write_str(&self.base_path()),
        }
    }
}
