//! Repository behaviour against the in-memory store.

use bson::{doc, Bson};
use chrono::{TimeZone, Utc};
use listings::testing::{date, sample_listings, sydney_listing, FailingStore};
use listings::{
    InsertMode, Listing, ListingError, ListingPatch, ListingRepository, ListingStore, MemoryStore,
    MinimumsQuery,
};

/// Helper to set up a repository seeded with listings.
async fn repo_with(listings: &[Listing]) -> ListingRepository<MemoryStore> {
    let repo = ListingRepository::new(MemoryStore::new());
    for listing in listings {
        repo.create_listing(listing).await.unwrap();
    }
    repo
}

fn sized(name: &str, bedrooms: i32, bathrooms: f64, reviewed: &str) -> Listing {
    Listing {
        bedrooms: Some(bedrooms),
        bathrooms: Some(bathrooms),
        last_review: Some(date(reviewed)),
        ..Listing::new(name)
    }
}

#[tokio::test]
async fn create_one_returns_generated_id() {
    let repo = repo_with(&[]).await;

    let outcome = repo.create_listing(&sample_listings()[0]).await.unwrap();

    let stored = repo.find_by_name("Lovely Loft").await.unwrap().unwrap();
    assert_eq!(stored.id, Some(outcome.inserted_id.clone()));
    assert!(outcome
        .to_string()
        .starts_with("New listing created with the following id: "));
}

#[tokio::test]
async fn create_one_rejects_blank_name_without_touching_store() {
    let repo = ListingRepository::new(FailingStore::new());

    let err = repo.create_listing(&Listing::new("")).await.unwrap_err();

    assert!(matches!(err, ListingError::InvalidListing { .. }));
    assert_eq!(repo.store().calls(), 0);
}

#[tokio::test]
async fn create_many_returns_ids_in_input_order() {
    let repo = repo_with(&[]).await;
    let listings = sample_listings();

    let outcome = repo
        .create_listings(&listings, InsertMode::Ordered)
        .await
        .unwrap();

    assert_eq!(outcome.inserted_count(), 4);
    assert!(outcome.is_complete());
    for (index, listing) in listings.iter().enumerate() {
        let stored = repo.find_by_name(&listing.name).await.unwrap().unwrap();
        assert_eq!(stored.id.as_ref(), outcome.inserted_ids.get(&index));
    }
}

#[tokio::test]
async fn ordered_create_many_never_attempts_records_after_a_failure() {
    let repo = repo_with(&[]).await;
    let mut listings = sample_listings();
    listings[1].name = String::new();

    let err = repo
        .create_listings(&listings, InsertMode::Ordered)
        .await
        .unwrap_err();

    let ListingError::InsertMany(outcome) = err else {
        panic!("expected a batch failure, got {err:?}");
    };
    assert_eq!(outcome.inserted_ids.keys().copied().collect::<Vec<_>>(), vec![0]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 1);
    assert_eq!(outcome.not_attempted(), vec![2, 3]);
    assert_eq!(repo.store().len(), 1);
}

#[tokio::test]
async fn unordered_create_many_attempts_every_record() {
    let repo = repo_with(&[]).await;
    let mut listings = sample_listings();
    listings[1].name = String::new();

    let err = repo
        .create_listings(&listings, InsertMode::Unordered)
        .await
        .unwrap_err();

    let ListingError::InsertMany(outcome) = err else {
        panic!("expected a batch failure, got {err:?}");
    };
    assert_eq!(outcome.inserted_ids.keys().copied().collect::<Vec<_>>(), vec![0, 2, 3]);
    assert!(outcome.not_attempted().is_empty());
    assert_eq!(repo.store().len(), 3);
}

#[tokio::test]
async fn store_rejections_follow_the_insert_mode() {
    // Store-side failure: the second record reuses the first one's _id
    let store = MemoryStore::new();
    store.insert_one(doc! { "_id": "taken", "name": "Existing" }).await.unwrap();
    let repo = ListingRepository::new(store);

    let mut listings = sample_listings();
    listings[1].id = Some("taken".into());

    let ordered = repo
        .create_listings(&listings[..3], InsertMode::Ordered)
        .await
        .unwrap_err();
    let ListingError::InsertMany(outcome) = ordered else {
        panic!("expected a batch failure");
    };
    assert_eq!(outcome.failures[0].index, 1);
    assert!(outcome.failures[0].message.contains("duplicate key"));
    assert_eq!(outcome.not_attempted(), vec![2]);

    let unordered = repo
        .create_listings(&listings[2..], InsertMode::Unordered)
        .await
        .unwrap();
    assert_eq!(unordered.inserted_count(), 2);
}

#[tokio::test]
async fn ordered_store_rejection_hides_later_local_rejection() {
    let store = MemoryStore::new();
    store.insert_one(doc! { "_id": "taken", "name": "Existing" }).await.unwrap();
    let repo = ListingRepository::new(store);

    let batch = vec![
        Listing {
            id: Some("taken".into()),
            ..Listing::new("Clash")
        },
        Listing::new("Valid"),
        Listing::new(""),
    ];

    let err = repo
        .create_listings(&batch, InsertMode::Ordered)
        .await
        .unwrap_err();

    let ListingError::InsertMany(outcome) = err else {
        panic!("expected a batch failure, got {err:?}");
    };
    let failed: Vec<usize> = outcome.failures.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![0]);
    assert_eq!(outcome.not_attempted(), vec![1, 2]);
    assert!(outcome.inserted_ids.is_empty());
    assert_eq!(repo.store().len(), 1);
}

#[tokio::test]
async fn find_by_name_absence_is_not_an_error() {
    let repo = repo_with(&sample_listings()).await;

    let found = repo.find_by_name("Nowhere Cottage").await.unwrap();

    assert!(found.is_none());
}

#[tokio::test]
async fn find_with_minimums_filters_and_orders_by_review_date() {
    let repo = repo_with(&[
        sized("small", 1, 1.0, "2019-05-01T00:00:00Z"),
        sized("old big", 5, 3.0, "2018-01-01T00:00:00Z"),
        sized("new big", 4, 2.0, "2019-04-01T00:00:00Z"),
        sized("few baths", 6, 1.5, "2019-06-01T00:00:00Z"),
        sized("mid big", 4, 2.5, "2018-09-01T00:00:00Z"),
    ])
    .await;

    let query = MinimumsQuery::new().with_min_bedrooms(4).with_min_bathrooms(2.0);
    let found = repo.find_with_minimums(&query).await.unwrap();

    let names: Vec<&str> = found.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["new big", "mid big", "old big"]);
    for listing in &found {
        assert!(listing.bedrooms.unwrap() >= 4);
        assert!(listing.bathrooms.unwrap() >= 2.0);
    }
}

#[tokio::test]
async fn counts_stored_as_doubles_are_still_readable() {
    let repo = repo_with(&[]).await;
    repo.store()
        .insert_one(doc! { "name": "Shell Cottage", "bedrooms": 2.0, "bathrooms": 1, "beds": 3.0 })
        .await
        .unwrap();

    let found = repo.find_by_name("Shell Cottage").await.unwrap().unwrap();
    assert_eq!(found.bedrooms, Some(2));
    assert_eq!(found.beds, Some(3));

    let query = MinimumsQuery::new().with_min_bedrooms(2).with_min_bathrooms(1.0);
    let roomy = repo.find_with_minimums(&query).await.unwrap();
    assert_eq!(roomy.len(), 1);
    assert_eq!(roomy[0].name, "Shell Cottage");
}

#[tokio::test]
async fn find_with_minimums_truncates_to_max_results() {
    let repo = repo_with(&[
        sized("a", 4, 2.0, "2019-01-01T00:00:00Z"),
        sized("b", 4, 2.0, "2019-02-01T00:00:00Z"),
        sized("c", 4, 2.0, "2019-03-01T00:00:00Z"),
    ])
    .await;

    let query = MinimumsQuery::new().with_min_bedrooms(4).with_max_results(2);
    let found = repo.find_with_minimums(&query).await.unwrap();

    let names: Vec<&str> = found.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["c", "b"]);
}

#[tokio::test]
async fn find_with_minimums_defaults_exclude_listings_without_counts() {
    // Range predicates never match a missing field
    let repo = repo_with(&sample_listings()).await;

    let found = repo.find_with_minimums(&MinimumsQuery::new()).await.unwrap();

    let mut names: Vec<&str> = found.iter().map(|l| l.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Beautiful Beach House", "Infinite Views", "Lovely Loft"]);
    // Reviewed listings sort ahead of unreviewed ones
    assert_eq!(found[0].name, "Beautiful Beach House");
}

#[tokio::test]
async fn find_with_minimums_empty_result_is_not_an_error() {
    let repo = repo_with(&sample_listings()).await;

    let found = repo
        .find_with_minimums(&MinimumsQuery::new().with_min_bedrooms(50))
        .await
        .unwrap();

    assert!(found.is_empty());
}

#[tokio::test]
async fn find_with_minimums_rejects_bad_arguments() {
    let repo = ListingRepository::new(FailingStore::new());

    let negative = MinimumsQuery::new().with_min_bathrooms(-1.0);
    let zero_cap = MinimumsQuery::new().with_max_results(0);

    assert!(matches!(
        repo.find_with_minimums(&negative).await,
        Err(ListingError::InvalidArgument { .. })
    ));
    assert!(matches!(
        repo.find_with_minimums(&zero_cap).await,
        Err(ListingError::InvalidArgument { .. })
    ));
    assert_eq!(repo.store().calls(), 0);
}

#[tokio::test]
async fn update_by_name_sets_fields_on_the_match() {
    let repo = repo_with(&sample_listings()).await;
    let patch = ListingPatch {
        bedrooms: Some(6),
        beds: Some(8),
        ..Default::default()
    };

    let outcome = repo.update_by_name("Infinite Views", &patch).await.unwrap();

    assert_eq!((outcome.matched, outcome.modified), (1, 1));
    let updated = repo.find_by_name("Infinite Views").await.unwrap().unwrap();
    assert_eq!(updated.bedrooms, Some(6));
    assert_eq!(updated.beds, Some(8));
    assert_eq!(updated.bathrooms, Some(4.5));
}

#[tokio::test]
async fn update_by_name_without_match_changes_nothing() {
    let repo = repo_with(&sample_listings()).await;
    let patch = ListingPatch {
        bedrooms: Some(2),
        ..Default::default()
    };

    let outcome = repo.update_by_name("Nowhere", &patch).await.unwrap();

    assert_eq!((outcome.matched, outcome.modified), (0, 0));
    assert!(outcome.upserted_id.is_none());
    assert_eq!(repo.store().len(), 4);
}

#[tokio::test]
async fn upsert_of_missing_name_inserts_exactly_one() {
    let repo = repo_with(&sample_listings()).await;
    let patch = ListingPatch {
        name: Some("Cozy Cottage".into()),
        bedrooms: Some(1),
        bathrooms: Some(1.0),
        ..Default::default()
    };

    let outcome = repo.upsert_by_name("Cozy Cottage", &patch).await.unwrap();

    assert_eq!(outcome.inserted_count(), 1);
    assert_eq!(outcome.modified, 0);
    assert_eq!(repo.store().len(), 5);
    let inserted = repo.find_by_name("Cozy Cottage").await.unwrap().unwrap();
    assert_eq!(inserted.id, outcome.upserted_id);
    assert_eq!(inserted.bedrooms, Some(1));
}

#[tokio::test]
async fn upsert_of_existing_name_updates_in_place() {
    let repo = repo_with(&sample_listings()).await;
    let patch = ListingPatch {
        beds: Some(2),
        ..Default::default()
    };

    let outcome = repo.upsert_by_name("Lovely Loft", &patch).await.unwrap();

    assert_eq!(outcome.inserted_count(), 0);
    assert_eq!((outcome.matched, outcome.modified), (1, 1));
    assert_eq!(repo.store().len(), 4);
    let updated = repo.find_by_name("Lovely Loft").await.unwrap().unwrap();
    assert_eq!(updated.beds, Some(2));
}

#[tokio::test]
async fn patch_cannot_blank_the_name() {
    let repo = ListingRepository::new(FailingStore::new());
    let patch = ListingPatch {
        name: Some("  ".into()),
        ..Default::default()
    };

    for upsert in [false, true] {
        let result = if upsert {
            repo.upsert_by_name("Lovely Loft", &patch).await
        } else {
            repo.update_by_name("Lovely Loft", &patch).await
        };
        assert!(matches!(result, Err(ListingError::InvalidListing { .. })));
    }
    assert_eq!(repo.store().calls(), 0);
}

#[tokio::test]
async fn empty_patch_is_rejected() {
    let repo = ListingRepository::new(FailingStore::new());

    let err = repo
        .update_by_name("Lovely Loft", &ListingPatch::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ListingError::InvalidArgument { .. }));
    assert_eq!(repo.store().calls(), 0);
}

#[tokio::test]
async fn fill_missing_property_types_only_touches_listings_without_one() {
    let repo = repo_with(&sample_listings()).await;

    let outcome = repo.fill_missing_property_types().await.unwrap();

    // Lovely Loft and Beautiful Beach House have no property type
    assert_eq!((outcome.matched, outcome.modified), (2, 2));
    let loft = repo.find_by_name("Lovely Loft").await.unwrap().unwrap();
    let views = repo.find_by_name("Infinite Views").await.unwrap().unwrap();
    assert_eq!(loft.property_type.as_deref(), Some("Unknown"));
    assert_eq!(views.property_type.as_deref(), Some("House"));

    let again = repo.fill_missing_property_types().await.unwrap();
    assert_eq!(again.matched, 0);
}

#[tokio::test]
async fn fill_missing_field_accepts_any_field_and_default() {
    let repo = repo_with(&sample_listings()).await;

    let outcome = repo.fill_missing_field("beds", 1).await.unwrap();

    assert_eq!(outcome.matched, 2);
    let room = repo.find_by_name("Private room in London").await.unwrap().unwrap();
    assert_eq!(room.beds, Some(1));

    assert!(matches!(
        repo.fill_missing_field("_id", Bson::Null).await,
        Err(ListingError::InvalidArgument { .. })
    ));
}

#[tokio::test]
async fn fill_missing_nested_field_fails_on_scalar_parent() {
    let repo = repo_with(&[]).await;
    repo.store()
        .insert_one(doc! { "name": "Flat address", "address": "12 Beach Rd" })
        .await
        .unwrap();

    let err = repo
        .fill_missing_field("address.suburb", "Bondi")
        .await
        .unwrap_err();

    assert!(matches!(err, ListingError::Storage(_)));
    assert!(err.to_string().contains("Cannot create field 'suburb'"));
}

#[tokio::test]
async fn delete_by_name_removes_one_listing() {
    let repo = repo_with(&sample_listings()).await;

    let outcome = repo.delete_by_name("Lovely Loft").await.unwrap();
    let missing = repo.delete_by_name("Lovely Loft").await.unwrap();

    assert_eq!(outcome.deleted, 1);
    assert_eq!(missing.deleted, 0);
    assert!(repo.find_by_name("Lovely Loft").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_scraped_before_removes_exactly_older_listings() {
    let scraped = |name: &str, when: &str| Listing {
        last_scraped: Some(date(when)),
        ..Listing::new(name)
    };
    let repo = repo_with(&[
        scraped("january", "2019-01-01T00:00:00Z"),
        scraped("march", "2019-03-01T00:00:00Z"),
        scraped("on the cutoff", "2019-02-15T00:00:00Z"),
        Listing::new("never scraped"),
    ])
    .await;

    let cutoff = Utc.with_ymd_and_hms(2019, 2, 15, 0, 0, 0).unwrap();
    let outcome = repo.delete_scraped_before(cutoff).await.unwrap();

    assert_eq!(outcome.deleted, 1);
    assert!(repo.find_by_name("january").await.unwrap().is_none());
    assert!(repo.find_by_name("march").await.unwrap().is_some());
    assert!(repo.find_by_name("on the cutoff").await.unwrap().is_some());
    assert!(repo.find_by_name("never scraped").await.unwrap().is_some());
}

#[tokio::test]
async fn cheapest_suburbs_averages_only_eligible_listings() {
    let mut listings = vec![
        sydney_listing("b1", "Bondi", 100.0),
        sydney_listing("b2", "Bondi", 200.0),
        sydney_listing("m1", "Manly", 90.0),
        sydney_listing("n1", "Newtown", 120.0),
    ];

    // Same suburb, but ineligible for one reason each
    let mut two_bed = sydney_listing("x1", "Manly", 1.0);
    two_bed.bedrooms = Some(2);
    let mut private_room = sydney_listing("x2", "Manly", 1.0);
    private_room.room_type = Some("Private room".into());
    let mut melbourne = sydney_listing("x3", "Manly", 1.0);
    if let Some(address) = melbourne.address.as_mut() {
        address.market = Some("Melbourne".into());
    }
    let mut blank_suburb = sydney_listing("x4", "", 1.0);
    blank_suburb.price = Some(0.5);
    let mut no_suburb = sydney_listing("x5", "", 1.0);
    if let Some(address) = no_suburb.address.as_mut() {
        address.suburb = None;
    }
    listings.extend([two_bed, private_room, melbourne, blank_suburb, no_suburb]);

    let repo = repo_with(&listings).await;

    let rows = repo.cheapest_suburbs("Australia", "Sydney", 10).await.unwrap();

    let summary: Vec<(&str, Option<f64>)> = rows
        .iter()
        .map(|r| (r.suburb.as_str(), r.average_price))
        .collect();
    assert_eq!(
        summary,
        vec![("Manly", Some(90.0)), ("Newtown", Some(120.0)), ("Bondi", Some(150.0))]
    );
}

#[tokio::test]
async fn cheapest_suburbs_respects_limit() {
    let listings: Vec<Listing> = (0..15)
        .map(|i| sydney_listing(&format!("l{i}"), &format!("Suburb {i:02}"), 50.0 + f64::from(i)))
        .collect();
    let repo = repo_with(&listings).await;

    let rows = repo.cheapest_suburbs("Australia", "Sydney", 10).await.unwrap();

    assert_eq!(rows.len(), 10);
    assert!(rows
        .windows(2)
        .all(|pair| pair[0].average_price <= pair[1].average_price));
    assert_eq!(rows[0].suburb, "Suburb 00");
}

#[tokio::test]
async fn store_errors_propagate_unchanged() {
    let repo = ListingRepository::new(FailingStore::new());

    let err = repo.find_by_name("Lovely Loft").await.unwrap_err();
    assert!(matches!(err, ListingError::Storage(_)));
    assert_eq!(err.to_string(), "storage error: connection reset by peer");

    assert!(repo.delete_by_name("x").await.is_err());
    assert!(repo.cheapest_suburbs("Australia", "Sydney", 3).await.is_err());
    assert_eq!(repo.store().calls(), 3);
}
