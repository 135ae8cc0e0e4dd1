use webhook_recipes::{SignatureVerifier, VerifierConfig};

fn main() {
    // WEBHOOK_SECRET is required; WEBHOOK_ALGORITHM defaults to sha256.
    let verifier = match VerifierConfig::from_env().and_then(|config| SignatureVerifier::from_config(&config)) {
        Ok(verifier) => verifier,
        Err(err) => {
            eprintln!("configuration error: {}", err);
            std::process::exit(1);
        }
    };

    let payload = br#"{"zen":"Keep it logically awesome."}"#;
    let headers = [
        ("X-GitHub-Event", "ping"),
        ("X-Hub-Signature-256", "sha256=0000"),
    ];

    let signature = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(verifier.header_name()))
        .map(|(_, value)| *value);

    match verifier.verify(payload, signature) {
        Ok(()) => println!("signature ok"),
        Err(err) => println!("rejected: {}", err),
    }
}
