use anyhow::{Context, Result, bail, ensure};
use clap::Parser;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

const START_EPOCH: i64 = 1_700_000_000_000;
const ROTATED_EPOCH: i64 = 1_699_395_200_000;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let base = args.base_url.trim_end_matches('/');

    let client = Client::builder().cookie_store(true).build()?;
    let anonymous = Client::new();

    let created: Value = client
        .post(format!("{base}/households"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let id = created["id"].as_str().context("missing id")?.to_string();
    let join_code = created["join_code"]
        .as_str()
        .context("missing join_code")?
        .to_string();

    println!("Created household {id} with join code {join_code}");
    println!("Initial state: {}", created["state"]);

    let state = json!({
        "roommates": ["A"],
        "chores": [],
        "startEpoch": START_EPOCH,
        "doneByWeek": {}
    });

    let set: Value = client
        .post(format!("{base}/households/{id}/state"))
        .json(&state)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    ensure!(set == json!({"ok": true}), "unexpected set state response {set}");

    let rejected = anonymous
        .post(format!("{base}/households/{id}/rotate-now"))
        .send()
        .await?
        .status();
    ensure!(
        rejected == StatusCode::FORBIDDEN,
        "rotate without cookie returned {rejected}"
    );

    let rotated: Value = client
        .post(format!("{base}/households/{id}/rotate-now"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    println!("Rotated: {rotated}");

    if rotated["startEpoch"].as_i64() != Some(ROTATED_EPOCH) {
        bail!("expected startEpoch {ROTATED_EPOCH}, got {}", rotated["startEpoch"]);
    }

    let stored: Value = anonymous
        .get(format!("{base}/households/{id}/state"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    ensure!(
        stored["startEpoch"] == json!(ROTATED_EPOCH) && stored["roommates"] == json!(["A"]),
        "unexpected stored state {stored}"
    );

    let joined: Value = anonymous
        .post(format!("{base}/join"))
        .query(&[("code", join_code.as_str())])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    ensure!(
        joined["id"].as_str() == Some(id.as_str()),
        "join returned {joined}"
    );

    println!("All checks passed for household {id}");

    Ok(())
}
