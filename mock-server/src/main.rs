use mock_server::{app_with, seed, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let username = std::env::var("PULP_USER").unwrap_or_else(|_| "admin".to_string());
    let password = std::env::var("PULP_PASSWORD").unwrap_or_else(|_| "admin".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("listening on {addr}{}", mock_server::API_ROOT);
    let state = AppState::new(seed(), &username, &password);
    axum::serve(listener, app_with(state)).await
}
