use serde::Serialize;

use zainmart_types::{QueryRequest, Record, Scope, SortType, Text};

use crate::variations::{VariationOption, variation_options};
use crate::{Client, ServiceError};

/// A variation (colors, storages, ...) with the options it offers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariationOptions {
    pub displayname: Option<Text>,
    pub options: Vec<VariationOption>,
}

impl Client {
    /// Full-text search across every public space.
    pub async fn search_in_catalog(&self, search: &str) -> Result<Vec<Record>, ServiceError> {
        let spaces = self.try_space_names(false, Scope::Public, &[]).await?;
        self.fan_out(spaces, Scope::Public, |space| {
            QueryRequest::subpath(space, "/")
                .exact(false)
                .sorted("created_at", SortType::Ascending)
                .matching(search)
                .with_payload(true)
                .with_attachments(false)
        })
        .await
    }

    pub async fn search_products(&self, space_name: &str, search: &str, limit: u32) -> Vec<Record> {
        let query = QueryRequest::search(space_name, "products")
            .exact(false)
            .sorted("shortname", SortType::Ascending)
            .matching(search)
            .limit(limit)
            .with_payload(true)
            .with_attachments(false);
        self.query_records(query, Scope::Managed).await
    }

    /// Options of one variation stored under `variations`. Unknown variations
    /// and unreadable bodies yield no options.
    pub async fn get_variation_options(&self, space_name: &str, variation: &str) -> VariationOptions {
        let records = self
            .get_space_contents(space_name, "variations", Scope::Managed, 200, 0, true)
            .await;
        let Some(record) = records.into_iter().find(|r| r.shortname == variation) else {
            return VariationOptions::default();
        };
        VariationOptions {
            options: variation_options(&record),
            displayname: record.attributes.displayname,
        }
    }
}
