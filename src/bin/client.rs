//! Command-line client for the upload endpoint.
//!
//! Uploads an image or video and prints the decoded scores per frame.
//!
//! ## Usage
//! `bhavna-client <server-url> <Image|Video> <path> [--at <ms>] [--rate <fps>]`
//!
//! - `--at` prints the interpolated scores at a playback time instead
//! - `--rate` must match the server's `FRAME_RATE` (default 4)

use anyhow::{Context, Result, anyhow, bail};
use reqwest::multipart::{Form, Part};
use std::path::PathBuf;

use bhavna::constants::DEFAULT_FRAME_RATE;
use bhavna::emotion::EmotionScores;
use bhavna::pipeline::MediaKind;
use bhavna::timeline::Timeline;

struct Args {
    server: String,
    file_type: String,
    path: PathBuf,
    at_ms: Option<u64>,
    frame_rate: u32,
}

fn usage() -> anyhow::Error {
    anyhow!("usage: bhavna-client <server-url> <Image|Video> <path> [--at <ms>] [--rate <fps>]")
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut at_ms = None;
    let mut frame_rate = DEFAULT_FRAME_RATE;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--at" => {
                let value = args.next().ok_or_else(usage)?;
                at_ms = Some(value.parse().context("--at expects milliseconds")?);
            }
            "--rate" => {
                let value = args.next().ok_or_else(usage)?;
                frame_rate = value.parse().context("--rate expects frames per second")?;
            }
            _ => positional.push(arg),
        }
    }

    let [server, file_type, path]: [String; 3] = positional.try_into().map_err(|_| usage())?;
    if MediaKind::from_discriminator(&file_type).is_none() {
        bail!("file type must be Image or Video, got {:?}", file_type);
    }

    Ok(Args {
        server: server.trim_end_matches('/').to_string(),
        file_type,
        path: PathBuf::from(path),
        at_ms,
        frame_rate,
    })
}

fn format_scores(scores: &EmotionScores) -> String {
    scores
        .iter()
        .map(|(emotion, value)| format!("{}={:.3}", emotion, value))
        .collect::<Vec<_>>()
        .join(" ")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;

    let data = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("failed to read {:?}", args.path))?;
    let file_name = args
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let form = Form::new()
        .text("fileType", args.file_type.clone())
        .part("file", Part::bytes(data).file_name(file_name));

    let response = reqwest::Client::new()
        .post(format!("{}/upload", args.server))
        .multipart(form)
        .send()
        .await
        .context("upload request failed")?;

    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        bail!("server returned {}: {}", status, String::from_utf8_lossy(&body));
    }

    let timeline = Timeline::from_response(&body, args.frame_rate)?;

    match args.at_ms {
        Some(at_ms) => {
            let scores = timeline
                .scores_at(at_ms)
                .ok_or_else(|| anyhow!("server returned no frames"))?;
            println!(
                "{}ms {} (dominant: {})",
                at_ms,
                format_scores(&scores),
                scores.dominant()
            );
        }
        None => {
            for (index, scores) in timeline.frames().iter().enumerate() {
                println!(
                    "{}ms {} (dominant: {})",
                    timeline.frame_time_ms(index),
                    format_scores(scores),
                    scores.dominant()
                );
            }
        }
    }

    Ok(())
}
