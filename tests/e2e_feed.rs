//! E2E tests for feed assembly and pagination

mod common;

use common::TestServer;
use serde_json::Value;

#[tokio::test]
async fn test_global_feed_pagination_invariant() {
    let server = TestServer::new().await;
    let (token, _user) = server.register_user("alice").await;

    for i in 0..12 {
        server.create_post(&token, &format!("post {}", i)).await;
    }

    // totalPages = ceil(12 / 5) = 3
    let response = server
        .client
        .get(server.url("/api/posts?page=1&limit=5"))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["totalPosts"], 12);
    assert_eq!(json["totalPages"], 3);
    assert_eq!(json["currentPage"], 1);

    let posts = json["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 5);
    assert_eq!(posts[0]["content"], "post 11");
    assert_eq!(posts[4]["content"], "post 7");

    // Page 3 holds the remaining 2 at offset (3-1)*5 = 10
    let response = server
        .client
        .get(server.url("/api/posts?page=3&limit=5"))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    let posts = json["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["content"], "post 1");
    assert_eq!(posts[1]["content"], "post 0");

    // Past the end: empty slice, totals unchanged
    let response = server
        .client
        .get(server.url("/api/posts?page=4&limit=5"))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert!(json["posts"].as_array().unwrap().is_empty());
    assert_eq!(json["totalPages"], 3);
}

#[tokio::test]
async fn test_global_feed_defaults() {
    let server = TestServer::new().await;
    let (token, _user) = server.register_user("alice").await;

    for i in 0..11 {
        server.create_post(&token, &format!("post {}", i)).await;
    }

    // Default page 1, limit 10
    let response = server
        .client
        .get(server.url("/api/posts"))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["currentPage"], 1);
    assert_eq!(json["posts"].as_array().unwrap().len(), 10);
    assert_eq!(json["totalPages"], 2);
}

#[tokio::test]
async fn test_feed_embeds_recent_comments() {
    let server = TestServer::new().await;
    let (alice_token, _alice) = server.register_user("alice").await;
    let (bob_token, _bob) = server.register_user("bob").await;

    let post = server.create_post(&alice_token, "busy thread").await;
    let post_id = post["id"].as_str().unwrap();

    for i in 0..4 {
        server
            .create_comment(&bob_token, post_id, &format!("comment {}", i))
            .await;
    }

    let response = server
        .client
        .get(server.url("/api/posts"))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    let feed_post = &json["posts"][0];

    assert_eq!(feed_post["commentCount"], 4);
    // Preview is capped at 3, newest first, authors resolved
    let comments = feed_post["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 3);
    assert_eq!(comments[0]["content"], "comment 3");
    assert_eq!(comments[0]["user"]["username"], "bob");
}

#[tokio::test]
async fn test_following_feed_scenario() {
    let server = TestServer::new().await;
    let (alice_token, alice) = server.register_user("alice").await;
    let (bob_token, _bob) = server.register_user("bob").await;

    let alice_id = alice["id"].as_str().unwrap();

    // bob follows alice
    let response = server
        .client
        .post(server.url(&format!("/api/users/{}/follow", alice_id)))
        .header("Authorization", format!("Bearer {}", bob_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // alice posts "hello"
    let post = server.create_post(&alice_token, "hello").await;
    let post_id = post["id"].as_str().unwrap();

    // bob's following feed contains exactly that post
    let response = server
        .client
        .get(server.url("/api/posts/following"))
        .header("Authorization", format!("Bearer {}", bob_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    let posts = json["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["content"], "hello");
    assert_eq!(posts[0]["user"]["username"], "alice");
    assert_eq!(json["totalPosts"], 1);

    // alice deletes the post
    let response = server
        .client
        .delete(server.url(&format!("/api/posts/{}", post_id)))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // bob's following feed is empty again
    let response = server
        .client
        .get(server.url("/api/posts/following"))
        .header("Authorization", format!("Bearer {}", bob_token))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert!(json["posts"].as_array().unwrap().is_empty());
    assert_eq!(json["totalPosts"], 0);
}

#[tokio::test]
async fn test_following_feed_excludes_unfollowed_authors() {
    let server = TestServer::new().await;
    let (alice_token, alice) = server.register_user("alice").await;
    let (bob_token, _bob) = server.register_user("bob").await;
    let (carol_token, _carol) = server.register_user("carol").await;

    let alice_id = alice["id"].as_str().unwrap();

    server.create_post(&alice_token, "from alice").await;
    server.create_post(&carol_token, "from carol").await;

    server
        .client
        .post(server.url(&format!("/api/users/{}/follow", alice_id)))
        .header("Authorization", format!("Bearer {}", bob_token))
        .send()
        .await
        .unwrap();

    let response = server
        .client
        .get(server.url("/api/posts/following"))
        .header("Authorization", format!("Bearer {}", bob_token))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    let posts = json["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["content"], "from alice");

    // Nobody followed: empty feed with zero totals
    let response = server
        .client
        .get(server.url("/api/posts/following"))
        .header("Authorization", format!("Bearer {}", carol_token))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert!(json["posts"].as_array().unwrap().is_empty());
    assert_eq!(json["totalPosts"], 0);
    assert_eq!(json["totalPages"], 0);
}
