//! Content classification by file extension.

use serde::{Deserialize, Serialize};

use crate::partition::Partition;

/// Content category of a request, derived from its path extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Html,
    Css,
    Json,
    /// Handlebars templates.
    Hbs,
    Js,
    Svg,
    Woff,
    Woff2,
    Png,
    Jpg,
    Gif,
    Ico,
    /// Allow-listed API call; never produced by [`classify`], only by the router.
    Api,
    /// Unrecognized extension. Served by direct fetch and never cached.
    PassThrough,
}

impl Category {
    /// Every category, including the synthetic ones.
    pub const ALL: [Category; 14] = [
        Category::Html,
        Category::Css,
        Category::Json,
        Category::Hbs,
        Category::Js,
        Category::Svg,
        Category::Woff,
        Category::Woff2,
        Category::Png,
        Category::Jpg,
        Category::Gif,
        Category::Ico,
        Category::Api,
        Category::PassThrough,
    ];

    /// Look up a category from an uppercased extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "HTML" => Category::Html,
            "CSS" => Category::Css,
            "JSON" => Category::Json,
            "HBS" => Category::Hbs,
            "JS" => Category::Js,
            "SVG" => Category::Svg,
            "WOFF" => Category::Woff,
            "WOFF2" => Category::Woff2,
            "PNG" => Category::Png,
            "JPG" => Category::Jpg,
            "GIF" => Category::Gif,
            "ICO" => Category::Ico,
            _ => Category::PassThrough,
        }
    }

    /// Partition that stores responses of this category.
    ///
    /// `None` means the request bypasses the cache entirely.
    pub fn partition(self) -> Option<Partition> {
        match self {
            Category::Html => Some(Partition::Markup),
            Category::Css => Some(Partition::Styles),
            Category::Json => Some(Partition::Data),
            Category::Hbs => Some(Partition::Templates),
            Category::Js => Some(Partition::Scripts),
            Category::Svg
            | Category::Woff
            | Category::Woff2
            | Category::Png
            | Category::Jpg
            | Category::Gif
            | Category::Ico => Some(Partition::Miscellaneous),
            Category::Api => Some(Partition::Api),
            Category::PassThrough => None,
        }
    }

    /// Whether requests of this category may carry a `?_=` cache-busting marker.
    pub fn strips_cache_buster(self) -> bool {
        matches!(self, Category::Html | Category::Json)
    }
}

/// Classify a request path by its extension.
///
/// The key is everything after the last `.` in the path, uppercased. A path
/// without a dot yields the whole path as the key, which never matches.
pub fn classify(path: &str) -> Category {
    let ext = path.rsplit('.').next().unwrap_or(path);
    Category::from_extension(&ext.to_ascii_uppercase())
}
