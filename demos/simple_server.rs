use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use webhook_recipes::server::webhook_router;
use webhook_recipes::{Dispatcher, DispatcherConfig, FnRecipe, Recipe, SignatureVerifier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dispatcher = Dispatcher::new(SignatureVerifier::sha256("mysecret")?, DispatcherConfig::default());

    let hello: Arc<dyn Recipe> = Arc::new(FnRecipe::new("hello", |_| async {
        println!("Hello");
        Ok(())
    }));
    let bye: Arc<dyn Recipe> = Arc::new(FnRecipe::new("bye", |_| async {
        println!("Bye");
        Ok(())
    }));
    dispatcher.register_handlers("push", [hello, bye]).await;

    let app = webhook_router(Arc::new(dispatcher), "/postreceive");
    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
