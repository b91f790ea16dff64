use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};

use crate::error::FieldError;

pub const CATEGORIES: [&str; 4] = [
    "Cleaning",
    "Beauty & Wellness",
    "Healthcare",
    "Home Maintenance",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Cleaning,
    #[serde(rename = "Beauty & Wellness")]
    BeautyWellness,
    Healthcare,
    #[serde(rename = "Home Maintenance")]
    HomeMaintenance,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cleaning => "Cleaning",
            Category::BeautyWellness => "Beauty & Wellness",
            Category::Healthcare => "Healthcare",
            Category::HomeMaintenance => "Home Maintenance",
        }
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cleaning" => Ok(Category::Cleaning),
            "Beauty & Wellness" => Ok(Category::BeautyWellness),
            "Healthcare" => Ok(Category::Healthcare),
            "Home Maintenance" => Ok(Category::HomeMaintenance),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub original: f64,
    pub discounted: f64,
}

// Document shape stored in the `services` collection. Field names match the
// wire format, so one struct covers BSON and the admin-facing JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: Price,
    pub duration: String,
    pub image: String,
    pub rating: f64,
    pub reviews: i32,
    pub professionals: Vec<String>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub is_active: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: Price,
    pub duration: String,
    pub image: String,
    pub rating: f64,
    pub reviews: i32,
    pub professionals: Vec<String>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Service> for ServiceResponse {
    fn from(service: Service) -> Self {
        Self {
            id: service.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: service.title,
            description: service.description,
            category: service.category,
            price: service.price,
            duration: service.duration,
            image: service.image,
            rating: service.rating,
            reviews: service.reviews,
            professionals: service.professionals,
            includes: service.includes,
            excludes: service.excludes,
            is_active: service.is_active,
            created_at: service.created_at.to_rfc3339(),
            updated_at: service.updated_at.to_rfc3339(),
        }
    }
}

// Summary shape joined into booking listings: title and price only.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceBrief {
    pub id: String,
    pub title: String,
    pub price: Price,
}

impl From<&Service> for ServiceBrief {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: service.title.clone(),
            price: service.price.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PriceInput {
    pub original: Option<f64>,
    pub discounted: Option<f64>,
}

// Raw request body for create and update. Every field is optional so that
// validation can report the whole list of problems at once instead of
// bailing on the first deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<PriceInput>,
    pub duration: Option<String>,
    pub image: Option<String>,
    pub rating: Option<f64>,
    pub reviews: Option<i32>,
    pub professionals: Option<Vec<String>>,
    pub includes: Option<Vec<String>>,
    pub excludes: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    matches!(rest, Some(rest) if !rest.is_empty() && !rest.starts_with('/'))
}

fn category_error() -> FieldError {
    FieldError::new(
        "category",
        format!("category must be one of: {}", CATEGORIES.join(", ")),
    )
}

fn validate_price(price: &PriceInput, errors: &mut Vec<FieldError>) -> Option<Price> {
    let original = match price.original {
        Some(value) if value > 0.0 => Some(value),
        _ => {
            errors.push(FieldError::new(
                "price.original",
                "price.original must be a positive number",
            ));
            None
        }
    };
    let discounted = match price.discounted {
        Some(value) if value > 0.0 => Some(value),
        _ => {
            errors.push(FieldError::new(
                "price.discounted",
                "price.discounted must be a positive number",
            ));
            None
        }
    };

    match (original, discounted) {
        (Some(original), Some(discounted)) => {
            if discounted > original {
                errors.push(FieldError::new(
                    "price.discounted",
                    "price.discounted cannot exceed price.original",
                ));
                None
            } else {
                Some(Price {
                    original,
                    discounted,
                })
            }
        }
        _ => None,
    }
}

impl ServiceInput {
    // Full validation for POST: all required fields must be present.
    pub fn into_service(self) -> Result<Service, Vec<FieldError>> {
        let mut errors = Vec::new();

        let title = match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => Some(title.to_string()),
            _ => {
                errors.push(FieldError::new("title", "title is required"));
                None
            }
        };
        let description = match self.description {
            Some(description) if !description.is_empty() => Some(description),
            _ => {
                errors.push(FieldError::new("description", "description is required"));
                None
            }
        };
        let category = match self.category.as_deref().map(Category::from_str) {
            Some(Ok(category)) => Some(category),
            _ => {
                errors.push(category_error());
                None
            }
        };
        let price = match &self.price {
            Some(price) => validate_price(price, &mut errors),
            None => {
                errors.push(FieldError::new(
                    "price.original",
                    "price.original must be a positive number",
                ));
                errors.push(FieldError::new(
                    "price.discounted",
                    "price.discounted must be a positive number",
                ));
                None
            }
        };
        let duration = match self.duration {
            Some(duration) if !duration.is_empty() => Some(duration),
            _ => {
                errors.push(FieldError::new("duration", "duration is required"));
                None
            }
        };
        let image = match self.image {
            Some(image) if is_http_url(&image) => Some(image),
            _ => {
                errors.push(FieldError::new("image", "image must be a valid URL"));
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let now = Utc::now();
        Ok(Service {
            id: None,
            title: title.unwrap_or_default(),
            description: description.unwrap_or_default(),
            category: category.unwrap_or(Category::Cleaning),
            price: price.unwrap_or(Price {
                original: 0.0,
                discounted: 0.0,
            }),
            duration: duration.unwrap_or_default(),
            image: image.unwrap_or_default(),
            rating: self.rating.unwrap_or(0.0),
            reviews: self.reviews.unwrap_or(0),
            professionals: self.professionals.unwrap_or_default(),
            includes: self.includes.unwrap_or_default(),
            excludes: self.excludes.unwrap_or_default(),
            is_active: self.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    // Partial validation for PUT: only fields present in the body are
    // checked, and the result is a `$set` document merging them in.
    pub fn into_update(self) -> Result<Document, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut set = Document::new();

        if let Some(title) = self.title.as_deref().map(str::trim) {
            if title.is_empty() {
                errors.push(FieldError::new("title", "title is required"));
            } else {
                set.insert("title", title);
            }
        }
        if let Some(description) = self.description {
            if description.is_empty() {
                errors.push(FieldError::new("description", "description is required"));
            } else {
                set.insert("description", description);
            }
        }
        if let Some(category) = self.category.as_deref() {
            match Category::from_str(category) {
                Ok(category) => {
                    set.insert("category", category.as_str());
                }
                Err(()) => errors.push(category_error()),
            }
        }
        if let Some(price) = &self.price {
            if let Some(price) = validate_price(price, &mut errors) {
                set.insert(
                    "price",
                    doc! { "original": price.original, "discounted": price.discounted },
                );
            }
        }
        if let Some(duration) = self.duration {
            if duration.is_empty() {
                errors.push(FieldError::new("duration", "duration is required"));
            } else {
                set.insert("duration", duration);
            }
        }
        if let Some(image) = self.image {
            if is_http_url(&image) {
                set.insert("image", image);
            } else {
                errors.push(FieldError::new("image", "image must be a valid URL"));
            }
        }
        if let Some(rating) = self.rating {
            set.insert("rating", rating);
        }
        if let Some(reviews) = self.reviews {
            set.insert("reviews", reviews);
        }
        if let Some(professionals) = self.professionals {
            set.insert("professionals", professionals);
        }
        if let Some(includes) = self.includes {
            set.insert("includes", includes);
        }
        if let Some(excludes) = self.excludes {
            set.insert("excludes", excludes);
        }
        if let Some(is_active) = self.is_active {
            set.insert("isActive", Bson::Boolean(is_active));
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        if set.is_empty() {
            return Err(vec![FieldError::new("body", "no fields to update")]);
        }
        Ok(set)
    }
}
