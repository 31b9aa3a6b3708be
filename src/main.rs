mod filters;
mod grid;
mod pricing;
mod server;

use anyhow::Result;

use crate::filters::FilterStore;
use crate::pricing::PricingClient;
use crate::pricing::dashboard::{self, Panel};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let base_url =
        std::env::var("LMPDASH_API_URL").expect("LMPDASH_API_URL environment variable not set");

    let mut client = PricingClient::new(base_url);
    if let Ok(token) = std::env::var("LMPDASH_API_TOKEN") {
        client = client.with_token(token);
    }

    if std::env::args().any(|arg| arg == "--serve") {
        let bind_addr =
            std::env::var("LMPDASH_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3044".to_string());
        return server::start_server(&bind_addr, client).await;
    }

    // One-shot mode: assemble a dashboard snapshot for the default
    // selection and print it.
    let mut store = FilterStore::new();

    println!("=== Price Archive ===\n");
    let available = client.available_years().await?;
    println!("Years:   {:?}", available.years);
    println!("Markets: {:?}", available.markets);

    let nodes = client.nodes(1000).await?;
    println!("\n=== Node Directory ({} nodes) ===\n", nodes.len());

    let categories = grid::classify(&nodes);
    println!(
        "Hubs: {} | Load zones: {} | Reserves: {}",
        categories.hubs.len(),
        categories.load_zones.len(),
        categories.reserves.len()
    );

    // Same default pair the dashboard preselects when the directory is
    // large enough, falling back to the front of the list.
    if let Some(node1) = nodes.get(18).or_else(|| nodes.first()) {
        store.set_node1(Some(node1.id));
        println!("Node 1: {} ({})", node1.code, node1.name);
    }
    if let Some(node2) = nodes.get(20).or_else(|| nodes.get(1)) {
        store.set_node2(Some(node2.id));
        println!("Node 2: {} ({})", node2.code, node2.name);
    }

    let selection = store.snapshot();
    println!("\n=== Dashboard Snapshot ===\n");
    println!(
        "Market: {} | Data type: {} | Aggregation: {} | Year: {}",
        selection.market,
        selection.data_type.as_str(),
        selection.aggregation.as_str(),
        selection.year.map_or("-".to_string(), |y| y.to_string())
    );

    let snapshot = dashboard::refresh_dashboard(&client, &selection).await;
    println!("Map timestamp: {}", snapshot.plan.map.timestamp);

    match &snapshot.map {
        Panel::Ready(map) => println!("Voronoi polygons: {}", map.features.len()),
        other => println!("Voronoi map: {}", panel_label(other)),
    }

    match &snapshot.status {
        Panel::Ready(status) => {
            println!("\nLMPs [USD/MWh]");
            for (title, entries) in [
                ("Hubs", &status.hubs),
                ("Load Zones", &status.load_zones),
                ("Reserves", &status.reserves),
            ] {
                println!("  {title}:");
                for entry in entries {
                    let value = entry
                        .value
                        .map_or("no data".to_string(), |v| format!("{v:8.2}"));
                    println!("    {:10} {} [{}]", entry.name, value, entry.color);
                }
            }
        }
        other => println!("Status indicators: {}", panel_label(other)),
    }

    match &snapshot.evolution {
        Panel::Ready(evolution) => {
            println!(
                "\n{} - monthly values (day {}, hour {}):",
                evolution.node_name, evolution.day, evolution.hour
            );
            for point in &evolution.data {
                match point.value {
                    Some(v) => println!("  month {:2} | {:8.2}", point.month, v),
                    None => println!("  month {:2} |  no data", point.month),
                }
            }
        }
        other => println!("\nEvolution panel: {}", panel_label(other)),
    }

    match &snapshot.distribution {
        Panel::Ready(ranked) => {
            println!("\nTop of the all-nodes distribution ({} nodes):", ranked.len());
            for (rank, node) in ranked.iter().take(10).enumerate() {
                println!("  #{:2} {} | {:8.2}", rank + 1, node.node_code, node.price);
            }
        }
        other => println!("\nDistribution panel: {}", panel_label(other)),
    }

    match &snapshot.stats {
        Panel::Ready(stats) => {
            println!(
                "\nYear stats: avg {:.2} | min {:.2} | max {:.2} | {} samples",
                stats.avg.unwrap_or(0.0),
                stats.min.unwrap_or(0.0),
                stats.max.unwrap_or(0.0),
                stats.count
            );
        }
        other => println!("\nStats panel: {}", panel_label(other)),
    }

    match &snapshot.congestion {
        Panel::Ready(points) => {
            println!("\n=== Congestion CSV ===");
            println!("Timestamp,{} Price,{} Price,Congestion", points[0].node1_code, points[0].node2_code);
            for point in points.iter().take(24) {
                println!(
                    "{},{},{},{}",
                    point.timestamp.to_rfc3339(),
                    format_opt(point.node1_price),
                    format_opt(point.node2_price),
                    format_opt(point.congestion_price)
                );
            }
        }
        other => println!("\nCongestion panel: {}", panel_label(other)),
    }

    Ok(())
}

fn panel_label<T>(panel: &Panel<T>) -> &'static str {
    match panel {
        Panel::Ready(_) => "ready",
        Panel::Empty => "no data",
        Panel::Failed(_) => "failed",
        Panel::NotRequested => "not requested",
    }
}

fn format_opt(value: Option<f64>) -> String {
    value.map_or(String::new(), |v| format!("{v:.2}"))
}
