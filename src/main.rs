use ar_coin_hunt::{
    bearing_degrees, destination_point, init_logging, CameraPose, CoinEvent, CoinTarget, CollectOutcome, ConfigManager,
    FrameInput, GeoPoint, HeadingReadings, HuntConfig, HuntSession, SimulatedGps, TrackingQuality,
};
use nalgebra::Vector3;
use tracing::info;

const FRAME_DT: f32 = 1.0 / 30.0;
const FRAMES_PER_FIX: usize = 30;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [config.json]", args.first().map_or("ar_coin_hunt", |s| s.as_str()));
        return Err("Invalid arguments".into());
    }

    let config = match args.get(1) {
        Some(path) => ConfigManager::from_file(path)?.config().clone(),
        None => HuntConfig::default(),
    };

    let start = GeoPoint::new(48.8584, 2.2945);
    let targets = vec![
        CoinTarget::new("fountain", destination_point(&start, 30.0, 60.0), 0.25).with_height(0.3),
        CoinTarget::new("bench", destination_point(&start, 80.0, 25.0), 0.5),
        CoinTarget::new("statue", destination_point(&start, 200.0, 90.0), 5.0),
        CoinTarget::new("faraway", destination_point(&start, 0.0, 1500.0), 1.0),
    ];

    let mut session = HuntSession::new(config)?;
    session.set_targets(targets.clone());
    session.start()?;

    let sink = session.location_sink();
    let mut gps = SimulatedGps::new(2024).with_jitter(1.5).with_accuracy(6.0).with_interval(2000);
    let mut camera = Vector3::new(0.0f32, 1.5, 0.0);

    // Walk to each collectible coin in turn, then try to collect it
    let mut position = start;
    for target in targets.iter().take(3) {
        let heading = bearing_degrees(&position, &target.coordinate);
        for fix in gps.walk(&position, &target.coordinate, 2.5) {
            sink.push(fix)?;
            for _ in 0..FRAMES_PER_FIX {
                camera.x += 0.01;
                session.tick(
                    FrameInput::new(FRAME_DT, TrackingQuality::Tracking)
                        .with_pose(CameraPose::at(camera))
                        .with_heading(HeadingReadings::attitude(heading)),
                );
            }
        }
        position = target.coordinate;

        let outcome = session.try_collect(&target.id);
        info!(coin = %target.id, ?outcome, "collect attempt");
        if let CollectOutcome::Success(value) = outcome {
            info!(coin = %target.id, value, "coin collected");
        }

        for event in session.drain_events() {
            match event {
                CoinEvent::Collected { id, value } => info!(coin = %id, value, "event: collected"),
                other => info!(event = ?other, "event"),
            }
        }
    }

    let status = session.status();
    info!(
        using_fallback = status.using_fallback,
        compass_degraded = status.compass_degraded,
        active_coins = status.active_coins,
        rejected_fixes = status.rejected_fixes,
        "session finished"
    );
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
