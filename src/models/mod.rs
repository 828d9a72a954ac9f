//! Data models
//!
//! Entities mirror the database rows one to one and are mapped with
//! `sqlx::FromRow`. Each entity has an `*Input` type used for both create
//! and full replacement, with `validate()` enforcing field constraints.

/// Store a closed set of labels as text via its `as_str` / `FromStr` pair.
macro_rules! text_column {
    ($ty:ty) => {
        impl<DB: ::sqlx::Database> ::sqlx::Type<DB> for $ty
        where
            String: ::sqlx::Type<DB>,
        {
            fn type_info() -> DB::TypeInfo {
                <String as ::sqlx::Type<DB>>::type_info()
            }

            fn compatible(ty: &DB::TypeInfo) -> bool {
                <String as ::sqlx::Type<DB>>::compatible(ty)
            }
        }

        impl<'r, DB: ::sqlx::Database> ::sqlx::Decode<'r, DB> for $ty
        where
            &'r str: ::sqlx::Decode<'r, DB>,
        {
            fn decode(
                value: <DB as ::sqlx::database::HasValueRef<'r>>::ValueRef,
            ) -> Result<Self, ::sqlx::error::BoxDynError> {
                let text = <&'r str as ::sqlx::Decode<'r, DB>>::decode(value)?;
                Ok(text.parse::<$ty>()?)
            }
        }

        impl<'q, DB: ::sqlx::Database> ::sqlx::Encode<'q, DB> for $ty
        where
            &'q str: ::sqlx::Encode<'q, DB>,
        {
            fn encode_by_ref(
                &self,
                buf: &mut <DB as ::sqlx::database::HasArguments<'q>>::ArgumentBuffer,
            ) -> ::sqlx::encode::IsNull {
                let text: &'q str = self.as_str();
                <&'q str as ::sqlx::Encode<'q, DB>>::encode_by_ref(&text, buf)
            }
        }
    };
}

mod asset;
mod content;
mod geo;
mod pagination;
mod publishing;
mod template_content;
pub mod validation;

pub use asset::{
    Asset, AssetAssociation, AssetAssociationInput, AssetAssociationView, AssetContent,
    AssetContentInput, AssetDetail, AssetInput, AssetType, AssetTypeInput, THUMBNAIL_SIZE,
};
pub use content::{
    AdSection, AdSectionInput, Campaign, CampaignInput, ContentProvider, ContentProviderInput,
    Partner, PartnerInput, Sponsor, SponsorInput,
};
pub use geo::{
    City, CityInput, Coordinates, Country, CountryInput, PostalCodeInput, PostalCodeLookup,
    PostalCodeMapper, State, StateInput,
};
pub use pagination::{ListParams, PagedResult};
pub use publishing::{PublishState, PublishingState, PublishingStateInput};
pub use template_content::{
    ContentFilter, ContentRelation, Template, TemplateContent, TemplateContentDetail,
    TemplateContentInput,
};
pub use validation::FieldError;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_text_columns_round_trip_through_sqlite() {
        let pool = create_test_pool().await.unwrap();
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query("CREATE TABLE labels (template TEXT, state TEXT)")
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query("INSERT INTO labels (template, state) VALUES (?, ?)")
            .bind(Template::VehicleEditorial)
            .bind(Some(PublishState::ReadyToApprove))
            .execute(sqlite)
            .await
            .unwrap();

        let (template, state): (Template, Option<PublishState>) =
            sqlx::query_as("SELECT template, state FROM labels")
                .fetch_one(sqlite)
                .await
                .unwrap();
        assert_eq!(template, Template::VehicleEditorial);
        assert_eq!(state, Some(PublishState::ReadyToApprove));

        let raw: (String,) = sqlx::query_as("SELECT state FROM labels")
            .fetch_one(sqlite)
            .await
            .unwrap();
        assert_eq!(raw.0, "Ready To Approve");
    }

    #[tokio::test]
    async fn test_unknown_label_fails_to_decode() {
        let pool = create_test_pool().await.unwrap();
        let sqlite = pool.as_sqlite().unwrap();
        let result: Result<(PublishState,), _> = sqlx::query_as("SELECT 'Archived'")
            .fetch_one(sqlite)
            .await;
        assert!(result.is_err());
    }
}
