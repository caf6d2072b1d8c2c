// tests/exam_tests.rs

use quiz_backend::{config::Config, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;

async fn spawn_app() -> Option<String> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping integration test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "exam_test_secret".to_string(),
        jwt_expiration: 600,
        jwt_refresh_expiration: 3600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState { pool, config };
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(address)
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    username: &str,
    role: &str,
) -> String {
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123",
            "role": role
        }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(response.status().as_u16(), 201);

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to login");
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    body["data"]["token"].as_str().unwrap().to_string()
}

/// Creates a topic and returns its id.
async fn create_topic(client: &reqwest::Client, address: &str, token: &str) -> (i64, String) {
    let name = unique_name("topic");
    let response = client
        .post(format!("{}/api/topics", address))
        .bearer_auth(token)
        .json(&serde_json::json!({"topics": [name]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let normalized = quiz_backend::models::topic::normalize_topic_name(&name);
    let response = client
        .get(format!("{}/api/topics", address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    let id = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == normalized.as_str())
        .expect("topic missing")["id"]
        .as_i64()
        .unwrap();
    (id, normalized)
}

/// Creates `count` questions on the topic, all with correct option "A",
/// and returns their ids.
async fn create_questions(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    topic_id: i64,
    difficulty: &str,
    count: usize,
) -> Vec<i64> {
    let batch: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            serde_json::json!({
                "question_text": format!("Question {} for topic {}", i, topic_id),
                "option_a": "right",
                "option_b": "wrong",
                "option_c": "wrong",
                "option_d": "wrong",
                "correct_option": "A",
                "topic": topic_id,
                "difficulty_level": difficulty
            })
        })
        .collect();

    let response = client
        .post(format!("{}/api/questions", address))
        .bearer_auth(token)
        .json(&batch)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .get(format!("{}/api/questions", address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|q| q["topic_id"].as_i64() == Some(topic_id))
        .map(|q| q["id"].as_i64().unwrap())
        .collect()
}

/// Creates a quiz set and returns its id.
async fn create_quiz_set(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    topic_id: i64,
    difficulty: &str,
    set_type: &str,
    question_ids: &[i64],
) -> i64 {
    let response = client
        .post(format!("{}/api/quiz-sets", address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "topic": topic_id,
            "difficulty_level": difficulty,
            "set_type": set_type,
            "questions": question_ids
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn easy_quiz_set_derives_ten_minute_time_limit() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address, &unique_name("tt"), "teacher").await;
    let (topic_id, _) = create_topic(&client, &address, &token).await;
    let questions = create_questions(&client, &address, &token, topic_id, "Easy", 2).await;

    let set_id = create_quiz_set(&client, &address, &token, topic_id, "Easy", "A", &questions).await;

    let response = client
        .get(format!("{}/api/quiz-sets?id={}", address, set_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    let set = &body["data"][0];
    assert_eq!(set["total_time"], 10);
    assert_eq!(set["question_count"], 2);
}

#[tokio::test]
async fn quiz_set_rejects_mismatched_question_difficulty() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address, &unique_name("mm"), "teacher").await;
    let (topic_id, _) = create_topic(&client, &address, &token).await;
    let easy = create_questions(&client, &address, &token, topic_id, "Easy", 1).await;
    let hard: Vec<i64> = create_questions(&client, &address, &token, topic_id, "Hard", 1)
        .await
        .into_iter()
        .filter(|id| !easy.contains(id))
        .collect();

    let mut mixed = easy.clone();
    mixed.extend(&hard);

    let response = client
        .post(format!("{}/api/quiz-sets", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "topic": topic_id,
            "difficulty_level": "Easy",
            "set_type": "A",
            "questions": mixed
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 406);
    let body: serde_json::Value = response.json().await.unwrap();
    // The error names the offending question
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains(&hard[0].to_string())
    );
}

#[tokio::test]
async fn quiz_set_rejects_question_from_other_topic() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address, &unique_name("ot"), "teacher").await;
    let (topic_a, _) = create_topic(&client, &address, &token).await;
    let (topic_b, _) = create_topic(&client, &address, &token).await;
    let foreign = create_questions(&client, &address, &token, topic_b, "Easy", 1).await;

    let response = client
        .post(format!("{}/api/quiz-sets", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "topic": topic_a,
            "difficulty_level": "Easy",
            "set_type": "A",
            "questions": foreign
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 406);
}

#[tokio::test]
async fn duplicate_quiz_set_for_same_slot_is_refused() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address, &unique_name("ds"), "teacher").await;
    let (topic_id, _) = create_topic(&client, &address, &token).await;
    let questions = create_questions(&client, &address, &token, topic_id, "Medium", 2).await;

    create_quiz_set(&client, &address, &token, topic_id, "Medium", "B", &questions).await;

    let response = client
        .post(format!("{}/api/quiz-sets", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "topic": topic_id,
            "difficulty_level": "Medium",
            "set_type": "B",
            "questions": questions
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 406);
}

#[tokio::test]
async fn second_attempt_for_same_set_returns_406() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let teacher = register_and_login(&client, &address, &unique_name("te"), "teacher").await;
    let student = register_and_login(&client, &address, &unique_name("st"), "student").await;
    let (topic_id, _) = create_topic(&client, &address, &teacher).await;
    let questions = create_questions(&client, &address, &teacher, topic_id, "Easy", 1).await;
    let set_id =
        create_quiz_set(&client, &address, &teacher, topic_id, "Easy", "A", &questions).await;

    let response = client
        .post(format!("{}/api/exam/attempts/start", address))
        .bearer_auth(&student)
        .json(&serde_json::json!({"quiz_set": set_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let response = client
        .post(format!("{}/api/exam/attempts/start", address))
        .bearer_auth(&student)
        .json(&serde_json::json!({"quiz_set": set_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 406);
}

#[tokio::test]
async fn starting_attempt_after_user_deletion_returns_404() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let teacher = register_and_login(&client, &address, &unique_name("te"), "teacher").await;
    let admin = register_and_login(&client, &address, &unique_name("ad"), "admin").await;
    let student_name = unique_name("gone");
    let student = register_and_login(&client, &address, &student_name, "student").await;
    let (topic_id, _) = create_topic(&client, &address, &teacher).await;
    let questions = create_questions(&client, &address, &teacher, topic_id, "Easy", 1).await;
    let set_id =
        create_quiz_set(&client, &address, &teacher, topic_id, "Easy", "C", &questions).await;

    // Delete the student; their access token is still unexpired
    let response = client
        .delete(format!("{}/api/auth/users?username={}", address, student_name))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .post(format!("{}/api/exam/attempts/start", address))
        .bearer_auth(&student)
        .json(&serde_json::json!({"quiz_set": set_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn starting_attempt_for_missing_set_returns_404() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let student = register_and_login(&client, &address, &unique_name("ms"), "student").await;

    let response = client
        .post(format!("{}/api/exam/attempts/start", address))
        .bearer_auth(&student)
        .json(&serde_json::json!({"quiz_set": 99999999}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn submit_answers_scores_and_finalizes_attempt() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let teacher = register_and_login(&client, &address, &unique_name("te"), "teacher").await;
    let student_name = unique_name("st");
    let student = register_and_login(&client, &address, &student_name, "student").await;
    let (topic_id, _) = create_topic(&client, &address, &teacher).await;
    let questions = create_questions(&client, &address, &teacher, topic_id, "Hard", 3).await;
    let set_id =
        create_quiz_set(&client, &address, &teacher, topic_id, "Hard", "C", &questions).await;

    let response = client
        .post(format!("{}/api/exam/attempts/start", address))
        .bearer_auth(&student)
        .json(&serde_json::json!({"quiz_set": set_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    let attempt_id = body["data"]["id"].as_i64().unwrap();

    // 2 of 3 correct (correct option is always "A" in the fixtures)
    let response = client
        .post(format!("{}/api/exam/answers", address))
        .bearer_auth(&student)
        .json(&serde_json::json!({
            "attempt": attempt_id,
            "answers": [
                {"question": questions[0], "selected_option": "A"},
                {"question": questions[1], "selected_option": "A"},
                {"question": questions[2], "selected_option": "B"}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // Re-submitting the same attempt is refused
    let response = client
        .post(format!("{}/api/exam/answers", address))
        .bearer_auth(&student)
        .json(&serde_json::json!({
            "attempt": attempt_id,
            "answers": [{"question": questions[0], "selected_option": "A"}]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 406);

    // The student's result report reflects the counts
    let response = client
        .get(format!("{}/api/results", address))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let result = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["attemptId"].as_i64() == Some(attempt_id))
        .expect("attempt missing from results");
    assert_eq!(result["totalQuestions"], 3);
    assert_eq!(result["correctAnswers"], 2);
    assert_eq!(result["incorrectAnswers"], 1);
    assert_eq!(result["percentage"], 67);
    let completion = result["completionTime"].as_str().unwrap();
    assert_eq!(completion.len(), 5);
    assert!(completion.contains(':'));
}

#[tokio::test]
async fn submit_rejects_duplicate_answers_in_batch() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let teacher = register_and_login(&client, &address, &unique_name("te"), "teacher").await;
    let student = register_and_login(&client, &address, &unique_name("st"), "student").await;
    let (topic_id, _) = create_topic(&client, &address, &teacher).await;
    let questions = create_questions(&client, &address, &teacher, topic_id, "Easy", 1).await;
    let set_id =
        create_quiz_set(&client, &address, &teacher, topic_id, "Easy", "D", &questions).await;

    let response = client
        .post(format!("{}/api/exam/attempts/start", address))
        .bearer_auth(&student)
        .json(&serde_json::json!({"quiz_set": set_id}))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    let attempt_id = body["data"]["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/api/exam/answers", address))
        .bearer_auth(&student)
        .json(&serde_json::json!({
            "attempt": attempt_id,
            "answers": [
                {"question": questions[0], "selected_option": "A"},
                {"question": questions[0], "selected_option": "B"}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 406);

    // The rejected batch must not have finalized the attempt
    let response = client
        .get(format!("{}/api/results", address))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .all(|r| r["attemptId"].as_i64() != Some(attempt_id))
    );
}

#[tokio::test]
async fn exam_lookup_hides_correct_options() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let teacher = register_and_login(&client, &address, &unique_name("te"), "teacher").await;
    let student = register_and_login(&client, &address, &unique_name("st"), "student").await;
    let (topic_id, _) = create_topic(&client, &address, &teacher).await;
    let questions = create_questions(&client, &address, &teacher, topic_id, "Medium", 2).await;
    create_quiz_set(&client, &address, &teacher, topic_id, "Medium", "A", &questions).await;

    let response = client
        .post(format!("{}/api/exam/quiz-set", address))
        .bearer_auth(&student)
        .json(&serde_json::json!({
            "topic": topic_id,
            "difficulty": "Medium",
            "set_type": "A"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total_time"], 15);
    let delivered = body["data"]["questions"].as_array().unwrap();
    assert_eq!(delivered.len(), 2);
    assert!(delivered.iter().all(|q| q.get("correct_option").is_none()));

    // Unsupported difficulty is a 406, not a parse error
    let response = client
        .post(format!("{}/api/exam/quiz-set", address))
        .bearer_auth(&student)
        .json(&serde_json::json!({
            "topic": topic_id,
            "difficulty": "Impossible",
            "set_type": "A"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 406);
}

#[tokio::test]
async fn leaderboard_returns_list_even_when_empty() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let student = register_and_login(&client, &address, &unique_name("lb"), "student").await;

    let response = client
        .get(format!("{}/api/leaderboard", address))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["data"].is_array());

    let response = client
        .get(format!("{}/api/leaderboard/top3", address))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().len() <= 3);
}

#[tokio::test]
async fn top3_ranks_by_percentage_and_truncates() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let teacher = register_and_login(&client, &address, &unique_name("te"), "teacher").await;
    let (topic_id, _) = create_topic(&client, &address, &teacher).await;
    let questions = create_questions(&client, &address, &teacher, topic_id, "Easy", 4).await;
    let set_id =
        create_quiz_set(&client, &address, &teacher, topic_id, "Easy", "A", &questions).await;

    // Four students with distinct scores: 4/4, 3/4, 2/4, 1/4
    let mut names = Vec::new();
    for correct in [4usize, 3, 2, 1] {
        let name = unique_name("rk");
        let token = register_and_login(&client, &address, &name, "student").await;
        names.push(name);

        let response = client
            .post(format!("{}/api/exam/attempts/start", address))
            .bearer_auth(&token)
            .json(&serde_json::json!({"quiz_set": set_id}))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = response.json().await.unwrap();
        let attempt_id = body["data"]["id"].as_i64().unwrap();

        let answers: Vec<serde_json::Value> = questions
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let option = if i < correct { "A" } else { "B" };
                serde_json::json!({"question": q, "selected_option": option})
            })
            .collect();

        let response = client
            .post(format!("{}/api/exam/answers", address))
            .bearer_auth(&token)
            .json(&serde_json::json!({"attempt": attempt_id, "answers": answers}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    // Scoped to the fresh topic so only these four users are ranked
    let response = client
        .get(format!("{}/api/leaderboard/top3?topic={}", address, topic_id))
        .bearer_auth(&teacher)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let rankers = body["data"].as_array().unwrap();

    // The 25% scorer falls off the end
    assert_eq!(rankers.len(), 3);
    let percentages: Vec<i64> = rankers
        .iter()
        .map(|r| r["percentage"].as_i64().unwrap())
        .collect();
    assert_eq!(percentages, vec![100, 75, 50]);
    let usernames: Vec<String> = rankers
        .iter()
        .map(|r| r["username"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(usernames, names[..3]);
}

#[tokio::test]
async fn teacher_report_counts_all_correct_attempters() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let teacher = register_and_login(&client, &address, &unique_name("te"), "teacher").await;
    let ace = register_and_login(&client, &address, &unique_name("ace"), "student").await;
    let dunce = register_and_login(&client, &address, &unique_name("dn"), "student").await;
    let (topic_id, _) = create_topic(&client, &address, &teacher).await;
    let questions = create_questions(&client, &address, &teacher, topic_id, "Easy", 2).await;
    let set_id =
        create_quiz_set(&client, &address, &teacher, topic_id, "Easy", "B", &questions).await;

    // The teacher also sits their own quiz with a perfect score; the
    // report must not count them among the attempters.
    for (token, options) in [
        (&ace, ["A", "A"]),
        (&dunce, ["B", "B"]),
        (&teacher, ["A", "A"]),
    ] {
        let response = client
            .post(format!("{}/api/exam/attempts/start", address))
            .bearer_auth(token)
            .json(&serde_json::json!({"quiz_set": set_id}))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = response.json().await.unwrap();
        let attempt_id = body["data"]["id"].as_i64().unwrap();

        let response = client
            .post(format!("{}/api/exam/answers", address))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "attempt": attempt_id,
                "answers": [
                    {"question": questions[0], "selected_option": options[0]},
                    {"question": questions[1], "selected_option": options[1]}
                ]
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    let response = client
        .get(format!("{}/api/reports/teacher", address))
        .bearer_auth(&teacher)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let report = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["quizSetId"].as_i64() == Some(set_id))
        .expect("set missing from teacher report");
    assert_eq!(report["attemptCount"], 2);
    assert_eq!(report["allCorrectCount"], 1);
    assert_eq!(report["notAllCorrectCount"], 1);

    // Students cannot read the teacher report
    let response = client
        .get(format!("{}/api/reports/teacher", address))
        .bearer_auth(&ace)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn results_are_private_to_the_student() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let a = register_and_login(&client, &address, &unique_name("pa"), "student").await;

    // Probing another user's results is forbidden for non-admins
    let response = client
        .get(format!("{}/api/results?user=1", address))
        .bearer_auth(&a)
        .send()
        .await
        .unwrap();
    // Either it is the student's own id (fine) or someone else's (403)
    assert!(matches!(response.status().as_u16(), 200 | 403));

    let response = client
        .get(format!("{}/api/results?user=99999999", address))
        .bearer_auth(&a)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}
