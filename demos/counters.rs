//! Walks through counter type management and absolute counters.
//!
//! This example shows how to:
//! - Create a client from the environment
//! - Define an absolute counter type
//! - Post deltas, including one the service rejects
//! - Read and reset counters
//!
//! Run with:
//! `BILLMYSERVICES_USERID=... BILLMYSERVICES_SECRETKEY=... cargo run --example counters`

use billmyservices::{Client, CounterType, CounterVersion, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("billmyservices=debug,counters=info")
        .init();

    let client = Client::from_env()?;

    println!("=== Counter Types ===");
    let credits = CounterType::new(
        "demo-credits",
        "Prepaid credits (demo)",
        0,
        -5,
        5,
        CounterVersion::AbsoluteCounter,
    );
    let added = client.add_counter_type(&credits)?.await;
    println!("Added `{}`: {}", credits.code(), added.is_success());

    match client.list_counter_types()?.await.into_result() {
        Ok(all) => {
            for counter_type in all {
                println!(
                    "{} ({}) [{}, {}] {}",
                    counter_type.code(),
                    counter_type.name(),
                    counter_type.k1(),
                    counter_type.k2(),
                    counter_type.version()
                );
            }
        }
        Err(reason) => eprintln!("Could not list counter types: {reason}"),
    }
    println!();

    println!("=== Posting Deltas ===");
    // Issue all of them first, then wait: nothing blocks until awaited
    let deltas = [3, 1, 4];
    let mut pending = Vec::new();
    for delta in deltas {
        pending.push(client.post_counter(credits.code(), "customer-42", delta)?);
    }
    for (delta, outcome) in deltas.iter().zip(pending) {
        match outcome.await.failure_message() {
            None => println!("+{delta}: accepted"),
            Some(reason) => println!("+{delta}: rejected ({reason})"),
        }
    }
    println!();

    println!("=== Reading And Resetting ===");
    let counter = client.read_counter(credits.code(), "customer-42")?.await;
    if let Some(counter) = counter.success() {
        println!("{} = {} (updated at {})", counter.code(), counter.value(), counter.time_ref());
    }

    let reset = client.reset_counter(credits.code(), "customer-42")?.await;
    println!("Reset: {}", reset.is_success());

    let deleted = client.delete_counter_type(credits.code())?.await;
    println!("Deleted `{}`: {}", credits.code(), deleted.is_success());

    Ok(())
}
