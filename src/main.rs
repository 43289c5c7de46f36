//! Headless match harness
//!
//! Spins up one match with two scripted players and prints every broadcast
//! as JSON. Useful for watching a full point sequence without a client.
//! Pass a JSON config file path to override the defaults.

use std::time::Duration;

use topspin::runtime::MatchRuntime;
use topspin::session::ClientMessage;
use topspin::MatchConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), topspin::MatchError> {
    env_logger::init();

    let cfg = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        }
        None => MatchConfig::default(),
    };
    log::info!("starting headless match (tick {}ms)", cfg.tick_interval_ms);

    let (runtime, channels) = MatchRuntime::new(cfg);
    let inbound = channels.inbound;
    let mut outbound = channels.outbound;
    let match_task = tokio::spawn(runtime.run());

    let printer = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => println!("{json}"),
                Err(err) => log::error!("encode failed: {err}"),
            }
        }
    });

    let send = |id: &str, msg: ClientMessage| {
        if inbound.send((id.to_owned(), msg)).is_err() {
            log::warn!("match gone, input dropped");
        }
    };

    send(
        "host",
        ClientMessage::Join {
            player_name: "Scripted Host".into(),
            player_color: "#e7572f".into(),
            private: false,
        },
    );
    send(
        "opponent",
        ClientMessage::Join {
            player_name: "Scripted Opponent".into(),
            player_color: "#2f7fe7".into(),
            private: false,
        },
    );

    // Wiggle both rackets for a while, then walk away from the table.
    for step in 0..400u32 {
        let phase = step as f32 * 0.1;
        send(
            "host",
            ClientMessage::Update {
                position_x: phase.sin() * 6.0,
                position_y: 4.0,
            },
        );
        send(
            "opponent",
            ClientMessage::Update {
                position_x: phase.cos() * 6.0,
                position_y: 4.0,
            },
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    drop(inbound);
    match match_task.await {
        Ok(result) => result?,
        Err(err) => log::error!("match task failed: {err}"),
    }
    let _ = printer.await;
    Ok(())
}
