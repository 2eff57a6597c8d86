mod common;

use anyhow::Result;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{bootcamp_body, BOSTON, BOSTON_ZIP, KINGSTON, LOWELL};

#[tokio::test]
async fn publisher_creates_bootcamp_with_location() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.register("John Doe", "john@gmail.com", "publisher").await?;

    let bootcamp = app.create_bootcamp(&token, "Devworks Bootcamp", BOSTON).await?;
    assert_eq!(bootcamp["slug"], "devworks-bootcamp");
    assert_eq!(bootcamp["photo"], "no-photo.jpg");
    assert_eq!(bootcamp["location"]["type"], "Point");
    assert_eq!(bootcamp["location"]["coordinates"][0], -71.104028);
    assert_eq!(bootcamp["location"]["coordinates"][1], 42.350846);

    let me = app
        .client
        .get(app.api("/auth/me"))
        .bearer_auth(&token)
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(bootcamp["user"], me["data"]["id"]);
    Ok(())
}

#[tokio::test]
async fn creation_rules() -> Result<()> {
    let app = common::spawn_app().await?;
    let user = app.register("Mary Williams", "mary@gmail.com", "user").await?;
    let publisher = app.register("John Doe", "john@gmail.com", "publisher").await?;

    let res = app
        .client
        .post(app.api("/bootcamps"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .client
        .post(app.api("/bootcamps"))
        .bearer_auth(&user)
        .json(&bootcamp_body("Users Cannot Publish", BOSTON))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .client
        .post(app.api("/bootcamps"))
        .bearer_auth(&publisher)
        .json(&json!({ "name": "Missing Bits" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert!(body["error"].as_str().unwrap_or_default().contains("Please add a description"));

    app.create_bootcamp(&publisher, "Devworks Bootcamp", BOSTON).await?;
    let res = app
        .client
        .post(app.api("/bootcamps"))
        .bearer_auth(&publisher)
        .json(&bootcamp_body("Second Bootcamp", LOWELL))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(res.json::<Value>().await?["error"]
        .as_str()
        .unwrap_or_default()
        .contains("has already published a bootcamp"));

    let other = app.register("Kevin Smith", "kevin@gmail.com", "publisher").await?;
    let res = app
        .client
        .post(app.api("/bootcamps"))
        .bearer_auth(&other)
        .json(&bootcamp_body("Devworks Bootcamp", LOWELL))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Duplicate field value entered");
    Ok(())
}

#[tokio::test]
async fn admins_may_publish_many() -> Result<()> {
    let app = common::spawn_app().await?;
    let admin = app.admin().await?;

    app.create_bootcamp(&admin, "Devworks Bootcamp", BOSTON).await?;
    app.create_bootcamp(&admin, "ModernTech Bootcamp", LOWELL).await?;

    let (_, list) = app.get_json("/bootcamps").await?;
    assert_eq!(list["count"], 2);
    Ok(())
}

#[tokio::test]
async fn only_owner_or_admin_may_modify() -> Result<()> {
    let app = common::spawn_app().await?;
    let owner = app.register("John Doe", "john@gmail.com", "publisher").await?;
    let stranger = app.register("Kevin Smith", "kevin@gmail.com", "publisher").await?;
    let admin = app.admin().await?;

    let bootcamp = app.create_bootcamp(&owner, "Devworks Bootcamp", BOSTON).await?;
    let id = bootcamp["id"].as_str().unwrap_or_default().to_string();

    let res = app
        .client
        .put(app.api(&format!("/bootcamps/{}", id)))
        .bearer_auth(&stranger)
        .json(&json!({ "housing": false }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.json::<Value>().await?["error"]
        .as_str()
        .unwrap_or_default()
        .contains("is not authorized to update this bootcamp"));

    let res = app
        .client
        .put(app.api(&format!("/bootcamps/{}", id)))
        .bearer_auth(&owner)
        .json(&json!({ "name": "Devworks Academy", "address": LOWELL }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = res.json::<Value>().await?["data"].clone();
    assert_eq!(updated["slug"], "devworks-academy");
    assert_eq!(updated["location"]["coordinates"][1], 42.643951);

    let res = app
        .client
        .put(app.api(&format!("/bootcamps/{}", id)))
        .bearer_auth(&admin)
        .json(&json!({ "jobGuarantee": true }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["jobGuarantee"], true);

    let res = app
        .client
        .delete(app.api(&format!("/bootcamps/{}", id)))
        .bearer_auth(&stranger)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .client
        .delete(app.api(&format!("/bootcamps/{}", id)))
        .bearer_auth(&owner)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let (status, body) = app.get_json(&format!("/bootcamps/{}", id)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("Bootcamp not found with id of {}", id));
    Ok(())
}

#[tokio::test]
async fn missing_bootcamp_is_reported_before_ownership() -> Result<()> {
    let app = common::spawn_app().await?;
    let publisher = app.register("John Doe", "john@gmail.com", "publisher").await?;
    let missing = "5d725a1b7b292f5f8ceff788";

    let res = app
        .client
        .put(app.api(&format!("/bootcamps/{}", missing)))
        .bearer_auth(&publisher)
        .json(&json!({ "housing": false }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        res.json::<Value>().await?["error"],
        format!("Resource not found with id of {}", missing)
    );

    let nil = "00000000-0000-0000-0000-000000000000";
    let res = app
        .client
        .delete(app.api(&format!("/bootcamps/{}", nil)))
        .bearer_auth(&publisher)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn radius_search() -> Result<()> {
    let app = common::spawn_app().await?;
    let admin = app.admin().await?;
    app.create_bootcamp(&admin, "Devworks Bootcamp", BOSTON).await?;
    app.create_bootcamp(&admin, "ModernTech Bootcamp", LOWELL).await?;
    app.create_bootcamp(&admin, "Codemasters", KINGSTON).await?;

    let (status, near) = app.get_json(&format!("/bootcamps/radius/{}/10", BOSTON_ZIP)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(near["count"], 1);
    assert_eq!(near["data"][0]["name"], "Devworks Bootcamp");

    let (_, wider) = app.get_json(&format!("/bootcamps/radius/{}/30", BOSTON_ZIP)).await?;
    assert_eq!(wider["count"], 2);

    // 30 km is about 18.6 mi, Lowell is further out
    let (_, metric) = app.get_json(&format!("/bootcamps/radius/{}/30?unit=km", BOSTON_ZIP)).await?;
    assert_eq!(metric["count"], 1);

    let (_, all) = app.get_json(&format!("/bootcamps/radius/{}/100", BOSTON_ZIP)).await?;
    assert_eq!(all["count"], 3);

    let (status, body) = app.get_json(&format!("/bootcamps/radius/{}/far", BOSTON_ZIP)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please provide a valid distance");

    let (status, _) = app.get_json("/bootcamps/radius/99999/10").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn advanced_results() -> Result<()> {
    let app = common::spawn_app().await?;
    let admin = app.admin().await?;
    let devworks = app.create_bootcamp(&admin, "Devworks Bootcamp", BOSTON).await?;
    let modern = app.create_bootcamp(&admin, "ModernTech Bootcamp", LOWELL).await?;
    app.create_bootcamp(&admin, "Codemasters", KINGSTON).await?;

    let devworks_id = devworks["id"].as_str().unwrap_or_default();
    let modern_id = modern["id"].as_str().unwrap_or_default();
    assert_eq!(app.add_course(&admin, devworks_id, "Front End", 8000).await?.status(), StatusCode::CREATED);
    assert_eq!(app.add_course(&admin, devworks_id, "Full Stack", 12000).await?.status(), StatusCode::CREATED);
    assert_eq!(app.add_course(&admin, modern_id, "Data Science", 6000).await?.status(), StatusCode::CREATED);

    let (_, body) = app.get_json("/bootcamps?select=name&sort=name").await?;
    let names: Vec<&str> = body["data"]
        .as_array()
        .map(|items| items.iter().filter_map(|b| b["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["Codemasters", "Devworks Bootcamp", "ModernTech Bootcamp"]);
    assert!(body["data"][0].get("description").is_none());
    assert!(body["data"][0]["id"].is_string());

    let (_, body) = app.get_json("/bootcamps?averageCost[lte]=8000").await?;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["name"], "ModernTech Bootcamp");

    let (_, body) = app.get_json("/bootcamps?sort=-averageCost&limit=1").await?;
    assert_eq!(body["data"][0]["name"], "Devworks Bootcamp");
    assert_eq!(body["data"][0]["averageCost"], 10000.0);
    assert_eq!(body["data"][0]["courses"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["pagination"]["next"], json!({ "page": 2, "limit": 1 }));
    assert!(body["pagination"].get("prev").is_none());

    let (_, body) = app.get_json("/bootcamps?sort=name&page=3&limit=1").await?;
    assert_eq!(body["data"][0]["name"], "ModernTech Bootcamp");
    assert_eq!(body["pagination"]["prev"], json!({ "page": 2, "limit": 1 }));
    assert!(body["pagination"].get("next").is_none());

    let (status, _) = app.get_json("/bootcamps?sort=secretField").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

fn image_form(bytes: Vec<u8>, file_name: &str, mime: &str) -> Result<Form> {
    let part = Part::bytes(bytes).file_name(file_name.to_string()).mime_str(mime)?;
    Ok(Form::new().part("file", part))
}

#[tokio::test]
async fn photo_upload() -> Result<()> {
    let app = common::spawn_app_with(|config| config.upload.max_file_size = 1024).await?;
    let owner = app.register("John Doe", "john@gmail.com", "publisher").await?;
    let bootcamp = app.create_bootcamp(&owner, "Devworks Bootcamp", BOSTON).await?;
    let id = bootcamp["id"].as_str().unwrap_or_default().to_string();
    let path = format!("/bootcamps/{}/photo", id);

    let res = app
        .client
        .put(app.api(&path))
        .bearer_auth(&owner)
        .multipart(image_form(b"plain text".to_vec(), "notes.txt", "text/plain")?)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Please upload an image file");

    let res = app
        .client
        .put(app.api(&path))
        .bearer_auth(&owner)
        .multipart(image_form(vec![0u8; 2048], "big.jpg", "image/jpeg")?)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Please upload an image less than 1024 bytes");

    let (_, unchanged) = app.get_json(&format!("/bootcamps/{}", id)).await?;
    assert_eq!(unchanged["data"]["photo"], "no-photo.jpg");

    let res = app
        .client
        .put(app.api(&path))
        .bearer_auth(&owner)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Please upload a file");

    let res = app
        .client
        .put(app.api(&path))
        .bearer_auth(&owner)
        .multipart(image_form(vec![0xFF, 0xD8, 0xFF, 0xE0], "camp.jpg", "image/jpeg")?)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let expected = format!("photo_{}.jpg", id);
    assert_eq!(res.json::<Value>().await?["data"], expected);

    let (_, stored) = app.get_json(&format!("/bootcamps/{}", id)).await?;
    assert_eq!(stored["data"]["photo"], expected);
    assert!(app.upload_dir.join(&expected).exists());

    let served = app.client.get(app.url(&format!("/uploads/{}", expected))).send().await?;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(served.bytes().await?.to_vec(), vec![0xFFu8, 0xD8, 0xFF, 0xE0]);
    Ok(())
}
