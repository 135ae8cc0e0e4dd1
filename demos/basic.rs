use std::sync::Arc;

use webhook_recipes::{
    compute_signature, format_signature_header, Dispatcher, DispatcherConfig, FnRecipe, HmacSha256,
    Recipe, SignatureVerifier,
};

#[tokio::main]
async fn main() {
    let verifier = SignatureVerifier::sha256("supersecret").expect("non-empty secret");
    let dispatcher = Dispatcher::new(verifier, DispatcherConfig::default());

    let hello: Arc<dyn Recipe> = Arc::new(FnRecipe::new("hello", |payload| async move {
        let repo = payload.str_at(&["repository", "full_name"])?;
        println!("push to {}", repo);
        Ok(())
    }));
    dispatcher.register_handlers("push", [hello]).await;

    let body = br#"{"ref":"refs/heads/main","repository":{"full_name":"owner/repo"}}"#;
    let signature = format_signature_header(
        &HmacSha256,
        &compute_signature(b"supersecret", body, &HmacSha256),
    );

    let outcome = dispatcher
        .handle_delivery(body, Some(&signature), Some("push"))
        .await;
    println!("{} ({})", outcome, outcome.status_code());
}
