//! Demo fixtures: a handful of users and suggestions around central
//! Bengaluru, with enough votes and comments to make every listing order
//! show something different.

use civic_shared::errors::AppResult;

use crate::models::{Location, NewComment, NewSuggestion, NewUser, SuggestionStatus};
use crate::services::auth::hash_password;
use crate::storage::Storage;

fn place(lat: f64, lng: f64, address: &str) -> Location {
    Location {
        lat,
        lng,
        address: Some(address.to_string()),
    }
}

pub async fn seed(storage: &dyn Storage) -> AppResult<()> {
    // Idempotent: a populated store is left alone.
    if !storage.list_suggestions().await?.is_empty() {
        tracing::info!("demo data already present, skipping seed");
        return Ok(());
    }

    let admin = storage
        .create_user(NewUser {
            username: "admin".into(),
            password_hash: hash_password("admin123")?,
            name: "Admin User".into(),
            email: "admin@example.com".into(),
            is_admin: true,
        })
        .await?;

    let jane = storage
        .create_user(NewUser {
            username: "janesmith".into(),
            password_hash: hash_password("password123")?,
            name: "Jane Smith".into(),
            email: "jane@example.com".into(),
            is_admin: false,
        })
        .await?;

    let john = storage
        .create_user(NewUser {
            username: "johndoe".into(),
            password_hash: hash_password("password123")?,
            name: "John Doe".into(),
            email: "john@example.com".into(),
            is_admin: false,
        })
        .await?;

    let pothole = storage
        .create_suggestion(NewSuggestion {
            title: "Fix pothole on Main Street".into(),
            description: "There's a large pothole that needs to be fixed urgently. It's causing damage to vehicles.".into(),
            location: place(12.9716, 77.5946, "Main Street, Downtown"),
            user_id: jane.id,
            photo_url: None,
        })
        .await?;

    let lights = storage
        .create_suggestion(NewSuggestion {
            title: "Install new street lights".into(),
            description: "The street lights on Park Avenue are not working properly. We need new LED lights installed for better visibility.".into(),
            location: place(12.9815, 77.6072, "Park Avenue"),
            user_id: john.id,
            photo_url: None,
        })
        .await?;

    let bike_lane = storage
        .create_suggestion(NewSuggestion {
            title: "Add bike lane on Hill Road".into(),
            description: "With increasing cyclists, we need a dedicated bike lane on Hill Road for safety.".into(),
            location: place(12.9892, 77.5900, "Hill Road"),
            user_id: jane.id,
            photo_url: None,
        })
        .await?;
    storage
        .update_status(bike_lane.id, SuggestionStatus::InProgress, None)
        .await?;

    let trees = storage
        .create_suggestion(NewSuggestion {
            title: "Plant trees near the community center".into(),
            description: "The area around the community center lacks greenery. We should plant native trees to improve the environment.".into(),
            location: place(12.9702, 77.6099, "Community Center"),
            user_id: john.id,
            photo_url: None,
        })
        .await?;
    storage
        .update_status(trees.id, SuggestionStatus::Done, None)
        .await?;

    let skate_park = storage
        .create_suggestion(NewSuggestion {
            title: "Build a skate park in residential area".into(),
            description: "We need a skate park for the youth in our residential area. It would provide a good recreational activity.".into(),
            location: place(12.9659, 77.5976, "Residential Zone"),
            user_id: jane.id,
            photo_url: None,
        })
        .await?;
    storage
        .update_status(
            skate_park.id,
            SuggestionStatus::Rejected,
            Some("Location not suitable due to noise concerns in residential area".into()),
        )
        .await?;

    let garden = storage
        .create_suggestion(NewSuggestion {
            title: "Create a community garden in Central Park".into(),
            description: "A community garden would allow residents to grow fresh produce and flowers while building community connections.".into(),
            location: place(12.9750, 77.5930, "Central Park"),
            user_id: john.id,
            photo_url: None,
        })
        .await?;
    storage.cast_vote(jane.id, garden.id, true).await?;
    storage.cast_vote(admin.id, garden.id, true).await?;

    let wifi = storage
        .create_suggestion(NewSuggestion {
            title: "Install public WiFi hotspots in downtown area".into(),
            description: "Free public WiFi would benefit local businesses, students, tourists, and residents alike.".into(),
            location: place(12.9680, 77.5910, "Downtown Square"),
            user_id: jane.id,
            photo_url: None,
        })
        .await?;
    storage.cast_vote(john.id, wifi.id, true).await?;
    storage.cast_vote(admin.id, wifi.id, false).await?;

    storage
        .create_comment(NewComment {
            content: "I noticed this too! The pothole is getting bigger every day.".into(),
            suggestion_id: pothole.id,
            user_id: john.id,
            parent_id: None,
        })
        .await?;
    storage
        .create_comment(NewComment {
            content: "I support this initiative. The current lights are too dim.".into(),
            suggestion_id: lights.id,
            user_id: jane.id,
            parent_id: None,
        })
        .await?;

    tracing::info!("demo data seeded");
    Ok(())
}
