//! Walk-through of a map session at a single venue.
//!
//! Run with: cargo run --example map_session

use nearby_core::{
    ClusterEngine, GeoPoint, LocationSample, PresenceRegistry, ProximityConfig, ScriptedLocations,
    UserPosition, ViewportState, VisibilityEngine,
};

fn main() {
    println!("Nearby Map Session Example\n");

    let config = ProximityConfig { radius_meters: 150.0, ..Default::default() };
    let venue = GeoPoint::new(37.7749, -122.4194);

    // The local user's phone reports a fix every 30s: at the venue, then walking away
    let walk = ScriptedLocations::from_samples(vec![
        LocationSample::new(37.77495, -122.41945, 0),
        LocationSample::new(37.77500, -122.41950, 30),
        LocationSample::new(37.77700, -122.41950, 60),
        LocationSample::new(37.77900, -122.41950, 90),
    ]);
    let mut me = VisibilityEngine::with_reference(&config, venue, walk);

    let mut registry = PresenceRegistry::from_config(&config);
    for (id, lat, lng) in [
        ("alex", 37.77492, -122.41938),
        ("sam", 37.77494, -122.41941),
        ("jordan", 37.77530, -122.41900),
        ("taylor", 37.77531, -122.41903),
        ("casey", 37.77460, -122.41990),
    ] {
        registry.upsert(UserPosition::visible(id, GeoPoint::new(lat, lng), 0));
    }

    let engine = ClusterEngine::new(config.cluster.clone());
    let mut viewport = ViewportState::from_config(venue, 0.003, &config);

    for now in (0..=90).step_by(30) {
        match me.tick(now) {
            Ok(Some(t)) => println!("t={:>3}s  visibility -> {} ({:?})", now, t.enabled, t.reason),
            Ok(None) => {}
            Err(e) => println!("t={:>3}s  location rejected: {}", now, e),
        }

        if now == 0 {
            match me.request_visible_here() {
                Ok(_) => println!("t={:>3}s  went visible", now),
                Err(e) => println!("t={:>3}s  cannot go visible: {}", now, e),
            }
        }

        if let Some(fix) = me.last_location() {
            registry.update_location("me", Some(fix.point), fix.timestamp);
        }
        registry.set_visible("me", me.is_visible(), now);

        let snapshot = registry.snapshot(now);
        println!(
            "t={:>3}s  {} visible users, distance to venue {:.0}m",
            now,
            snapshot.len(),
            me.distance_to_zone().unwrap_or(f64::NAN)
        );
    }

    println!("\nZooming in:");
    let users = registry.snapshot(90);
    for _ in 0..4 {
        let clusters = engine.compute(&users, viewport.span);
        println!(
            "  span {:.5} ({:?}): merge radius {:.0}m, {} markers",
            viewport.span,
            viewport.zoom_band(),
            engine.merge_radius(viewport.span),
            clusters.len()
        );
        for cluster in &clusters {
            if cluster.is_singleton() {
                println!("    {}", cluster.id);
            } else {
                println!(
                    "    [{}] {} users {:?} at ({:.5}, {:.5})",
                    cluster.id,
                    cluster.member_count(),
                    cluster.member_ids(),
                    cluster.centroid.latitude,
                    cluster.centroid.longitude
                );
            }
        }
        if let Some(home) = clusters.iter().find(|c| c.contains("alex")) {
            println!("    alex is under marker {}", home.id);
        }
        viewport.zoom_in();
    }
}
