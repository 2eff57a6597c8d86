mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{BOSTON, LOWELL};

async fn id_of(res: reqwest::Response) -> Result<String> {
    let body = res.json::<Value>().await?;
    Ok(body["data"]["id"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn courses_drive_average_cost() -> Result<()> {
    let app = common::spawn_app().await?;
    let owner = app.register("John Doe", "john@gmail.com", "publisher").await?;
    let bootcamp = app.create_bootcamp(&owner, "Devworks Bootcamp", BOSTON).await?;
    let bootcamp_id = bootcamp["id"].as_str().unwrap_or_default().to_string();

    let res = app.add_course(&owner, &bootcamp_id, "Front End", 8000).await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = app.add_course(&owner, &bootcamp_id, "Back End", 8001).await?;
    let back_end = id_of(res).await?;

    let (_, camp) = app.get_json(&format!("/bootcamps/{}", bootcamp_id)).await?;
    assert_eq!(camp["data"]["averageCost"], 8010.0);

    let res = app
        .client
        .put(app.api(&format!("/courses/{}", back_end)))
        .bearer_auth(&owner)
        .json(&json!({ "tuition": 12000 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let (_, camp) = app.get_json(&format!("/bootcamps/{}", bootcamp_id)).await?;
    assert_eq!(camp["data"]["averageCost"], 10000.0);

    let res = app
        .client
        .delete(app.api(&format!("/courses/{}", back_end)))
        .bearer_auth(&owner)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let (_, camp) = app.get_json(&format!("/bootcamps/{}", bootcamp_id)).await?;
    assert_eq!(camp["data"]["averageCost"], 8000.0);
    Ok(())
}

#[tokio::test]
async fn course_listings_embed_bootcamp_summary() -> Result<()> {
    let app = common::spawn_app().await?;
    let owner = app.register("John Doe", "john@gmail.com", "publisher").await?;
    let bootcamp = app.create_bootcamp(&owner, "Devworks Bootcamp", BOSTON).await?;
    let bootcamp_id = bootcamp["id"].as_str().unwrap_or_default().to_string();
    let course_id = id_of(app.add_course(&owner, &bootcamp_id, "Front End", 8000).await?).await?;

    let (_, all) = app.get_json("/courses").await?;
    assert_eq!(all["count"], 1);
    assert_eq!(all["data"][0]["bootcamp"]["name"], "Devworks Bootcamp");
    assert_eq!(all["data"][0]["bootcamp"]["id"], bootcamp_id.as_str());

    let (_, one) = app.get_json(&format!("/courses/{}", course_id)).await?;
    assert_eq!(one["data"]["title"], "Front End");
    assert_eq!(one["data"]["bootcamp"]["description"], "Full stack web development");

    let (_, nested) = app.get_json(&format!("/bootcamps/{}/courses", bootcamp_id)).await?;
    assert_eq!(nested["count"], 1);
    assert_eq!(nested["data"][0]["bootcamp"], bootcamp_id.as_str());

    let (_, filtered) = app.get_json("/courses?minimumSkill=advanced").await?;
    assert_eq!(filtered["count"], 0);
    Ok(())
}

#[tokio::test]
async fn course_permissions_and_validation() -> Result<()> {
    let app = common::spawn_app().await?;
    let owner = app.register("John Doe", "john@gmail.com", "publisher").await?;
    let stranger = app.register("Kevin Smith", "kevin@gmail.com", "publisher").await?;
    let bootcamp = app.create_bootcamp(&owner, "Devworks Bootcamp", BOSTON).await?;
    let bootcamp_id = bootcamp["id"].as_str().unwrap_or_default().to_string();

    let res = app.add_course(&stranger, &bootcamp_id, "Intruder Course", 100).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.json::<Value>().await?["error"]
        .as_str()
        .unwrap_or_default()
        .contains("is not authorized to add to this bootcamp"));

    let res = app
        .client
        .post(app.api(&format!("/bootcamps/{}/courses", bootcamp_id)))
        .bearer_auth(&owner)
        .json(&json!({ "title": "No Tuition", "description": "d", "weeks": "4", "minimumSkill": "expert" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let error = res.json::<Value>().await?["error"].as_str().unwrap_or_default().to_string();
    assert!(error.contains("Please add a tuition cost"));
    assert!(error.contains("Minimum skill must be one of: beginner, intermediate, advanced"));

    let course_id = id_of(app.add_course(&owner, &bootcamp_id, "Front End", 8000).await?).await?;
    let res = app
        .client
        .put(app.api(&format!("/courses/{}", course_id)))
        .bearer_auth(&stranger)
        .json(&json!({ "title": "Hijacked" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let missing = "00000000-0000-0000-0000-000000000000";
    let res = app.add_course(&owner, missing, "Nowhere", 100).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await?["error"], format!("No bootcamp with the id of {}", missing));
    Ok(())
}

#[tokio::test]
async fn reviews_drive_average_rating() -> Result<()> {
    let app = common::spawn_app().await?;
    let owner = app.register("John Doe", "john@gmail.com", "publisher").await?;
    let mary = app.register("Mary Williams", "mary@gmail.com", "user").await?;
    let sasha = app.register("Sasha Ryan", "sasha@gmail.com", "user").await?;
    let bootcamp = app.create_bootcamp(&owner, "Devworks Bootcamp", BOSTON).await?;
    let bootcamp_id = bootcamp["id"].as_str().unwrap_or_default().to_string();

    let res = app.add_review(&owner, &bootcamp_id, 9).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app.add_review(&mary, &bootcamp_id, 8).await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let marys = id_of(res).await?;
    assert_eq!(app.add_review(&sasha, &bootcamp_id, 10).await?.status(), StatusCode::CREATED);

    let (_, camp) = app.get_json(&format!("/bootcamps/{}", bootcamp_id)).await?;
    assert_eq!(camp["data"]["averageRating"], 9.0);

    let res = app.add_review(&mary, &bootcamp_id, 2).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Duplicate field value entered");

    let res = app.add_review(&sasha, &bootcamp_id, 11).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .client
        .put(app.api(&format!("/reviews/{}", marys)))
        .bearer_auth(&sasha)
        .json(&json!({ "rating": 1 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .client
        .put(app.api(&format!("/reviews/{}", marys)))
        .bearer_auth(&mary)
        .json(&json!({ "rating": 4 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let (_, camp) = app.get_json(&format!("/bootcamps/{}", bootcamp_id)).await?;
    assert_eq!(camp["data"]["averageRating"], 7.0);

    let (_, reviews) = app.get_json(&format!("/bootcamps/{}/reviews", bootcamp_id)).await?;
    assert_eq!(reviews["count"], 2);
    let (_, review) = app.get_json(&format!("/reviews/{}", marys)).await?;
    assert_eq!(review["data"]["bootcamp"]["name"], "Devworks Bootcamp");

    let res = app
        .client
        .delete(app.api(&format!("/reviews/{}", marys)))
        .bearer_auth(&mary)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let (_, camp) = app.get_json(&format!("/bootcamps/{}", bootcamp_id)).await?;
    assert_eq!(camp["data"]["averageRating"], 10.0);
    Ok(())
}

#[tokio::test]
async fn deleting_a_bootcamp_removes_its_courses_and_reviews() -> Result<()> {
    let app = common::spawn_app().await?;
    let admin = app.admin().await?;
    let devworks = app.create_bootcamp(&admin, "Devworks Bootcamp", BOSTON).await?;
    let modern = app.create_bootcamp(&admin, "ModernTech Bootcamp", LOWELL).await?;
    let devworks_id = devworks["id"].as_str().unwrap_or_default().to_string();
    let modern_id = modern["id"].as_str().unwrap_or_default().to_string();

    let doomed = id_of(app.add_course(&admin, &devworks_id, "Front End", 8000).await?).await?;
    app.add_course(&admin, &modern_id, "Data Science", 6000).await?;
    app.add_review(&admin, &devworks_id, 7).await?;

    let res = app
        .client
        .delete(app.api(&format!("/bootcamps/{}", devworks_id)))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let (status, body) = app.get_json(&format!("/courses/{}", doomed)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("No course with the id of {}", doomed));

    let (_, courses) = app.get_json("/courses").await?;
    assert_eq!(courses["count"], 1);
    let (_, reviews) = app.get_json("/reviews").await?;
    assert_eq!(reviews["count"], 0);
    Ok(())
}
