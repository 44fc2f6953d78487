#[tokio::main]
async fn main() {
    matchday_oracle_lib::run().await
}
