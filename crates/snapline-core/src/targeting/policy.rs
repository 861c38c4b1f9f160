use glam::Vec2;

use crate::settings::{Settings, TargetingMode};
use crate::world::{EntityCategory, EntityRecord, WorldSnapshot};

/// Filters applied before any selection policy.
pub fn is_eligible(
    entity: &EntityRecord,
    snapshot: &WorldSnapshot,
    settings: &Settings,
    neutral_faction: u32,
) -> bool {
    let targeting = &settings.targeting;

    if !entity.alive || entity.distance > targeting.max_distance {
        return false;
    }
    if entity.address == snapshot.local.address && entity.address != 0 {
        return false;
    }
    if !category_allowed(entity.category, settings) {
        return false;
    }

    let same_team = entity.faction == snapshot.local.faction;
    !same_team || entity.faction == neutral_faction || targeting.target_team
}

fn category_allowed(category: EntityCategory, settings: &Settings) -> bool {
    let esp = &settings.esp;
    let targeting = &settings.targeting;
    match category {
        EntityCategory::Infantry => esp.show_infantry,
        EntityCategory::PoweredArmor => esp.show_powered_armor && !targeting.ignore_powered_armor,
        EntityCategory::GroundVehicle => esp.show_ground_vehicles && !targeting.ignore_vehicles,
        EntityCategory::AirVehicle => esp.show_air_vehicles && !targeting.ignore_vehicles,
        EntityCategory::Turret => esp.show_turrets,
        EntityCategory::Other | EntityCategory::Unknown => esp.show_others,
    }
}

/// Screen-space distance of the entity's aim point from the screen center.
fn screen_deviation(entity: &EntityRecord, center: Vec2) -> Option<f32> {
    entity
        .head_screen_position
        .or(entity.screen_position)
        .map(|point| point.distance(center))
}

/// Pick at most one target from `snapshot` with the configured policy.
pub fn select_target<'a>(
    snapshot: &'a WorldSnapshot,
    settings: &Settings,
    neutral_faction: u32,
) -> Option<&'a EntityRecord> {
    let center = snapshot.screen.center();
    let fov = settings.targeting.fov;
    let mut candidates = snapshot
        .entities
        .iter()
        .filter(|e| is_eligible(e, snapshot, settings, neutral_faction));

    match settings.targeting.mode {
        TargetingMode::Fov => candidates
            .filter_map(|e| screen_deviation(e, center).map(|d| (e, d)))
            .filter(|(_, d)| *d <= fov)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(e, _)| e),
        TargetingMode::SmartFov => candidates
            .filter(|e| screen_deviation(e, center).is_some_and(|d| d <= fov))
            .min_by(|a, b| a.distance.total_cmp(&b.distance)),
        TargetingMode::Distance => candidates.min_by(|a, b| a.distance.total_cmp(&b.distance)),
        TargetingMode::Health => candidates.min_by(|a, b| a.health.total_cmp(&b.health)),
        TargetingMode::Name => {
            let wanted = settings.targeting.target_name.trim();
            if wanted.is_empty() {
                return None;
            }
            candidates.find(|e| e.name.trim().eq_ignore_ascii_case(wanted))
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::math::ScreenSize;
    use crate::world::LocalPlayer;

    const OWN: u32 = 1;
    const ENEMY: u32 = 2;
    const NEUTRAL: u32 = 0;

    fn snapshot(entities: Vec<EntityRecord>) -> WorldSnapshot {
        let mut snapshot = WorldSnapshot::empty(ScreenSize::new(1000.0, 1000.0));
        snapshot.local = LocalPlayer {
            address: 0xAA00,
            faction: OWN,
            ..Default::default()
        };
        snapshot.entities = entities;
        snapshot
    }

    fn enemy(address: u64, distance: f32, screen: Option<(f32, f32)>) -> EntityRecord {
        EntityRecord {
            address,
            category: EntityCategory::Infantry,
            faction: ENEMY,
            health: 100.0,
            health_max: 100.0,
            distance,
            position: Vec3::new(0.0, 0.0, distance),
            head_screen_position: screen.map(|(x, y)| Vec2::new(x, y)),
            screen_position: screen.map(|(x, y)| Vec2::new(x, y + 20.0)),
            alive: true,
            ..Default::default()
        }
    }

    fn settings(mode: TargetingMode) -> Settings {
        let mut settings = Settings::default();
        settings.targeting.mode = mode;
        settings
    }

    #[test]
    fn test_smart_fov_prefers_world_distance() {
        // screen-adjacent but far vs. off-center but near
        let far = enemy(1, 200.0, Some((502.0, 500.0)));
        let near = enemy(2, 20.0, Some((600.0, 540.0)));
        let outside = enemy(3, 5.0, Some((900.0, 900.0)));
        let world = snapshot(vec![far, near, outside]);

        let target = select_target(&world, &settings(TargetingMode::SmartFov), NEUTRAL);
        assert_eq!(target.map(|t| t.address), Some(2));
    }

    #[test]
    fn test_fov_prefers_screen_center() {
        let far = enemy(1, 200.0, Some((502.0, 500.0)));
        let near = enemy(2, 20.0, Some((600.0, 540.0)));
        let world = snapshot(vec![near, far]);

        let target = select_target(&world, &settings(TargetingMode::Fov), NEUTRAL);
        assert_eq!(target.map(|t| t.address), Some(1));
    }

    #[test]
    fn test_fov_modes_need_a_screen_point() {
        let world = snapshot(vec![enemy(1, 10.0, None)]);
        assert!(select_target(&world, &settings(TargetingMode::Fov), NEUTRAL).is_none());
        assert!(select_target(&world, &settings(TargetingMode::SmartFov), NEUTRAL).is_none());
        assert!(select_target(&world, &settings(TargetingMode::Distance), NEUTRAL).is_some());
    }

    #[test]
    fn test_distance_and_health_policies() {
        let mut weak = enemy(1, 90.0, None);
        weak.health = 12.0;
        let close = enemy(2, 30.0, None);
        let world = snapshot(vec![weak, close]);

        let by_distance = select_target(&world, &settings(TargetingMode::Distance), NEUTRAL);
        assert_eq!(by_distance.map(|t| t.address), Some(2));
        let by_health = select_target(&world, &settings(TargetingMode::Health), NEUTRAL);
        assert_eq!(by_health.map(|t| t.address), Some(1));
    }

    #[test]
    fn test_name_policy() {
        let mut named = enemy(1, 50.0, None);
        named.name = "  BigBob ".to_string();
        let world = snapshot(vec![enemy(2, 10.0, None), named]);

        let mut config = settings(TargetingMode::Name);
        config.targeting.target_name = "bigbob".to_string();
        assert_eq!(
            select_target(&world, &config, NEUTRAL).map(|t| t.address),
            Some(1)
        );

        config.targeting.target_name = "  ".to_string();
        assert!(select_target(&world, &config, NEUTRAL).is_none());
    }

    #[test]
    fn test_eligibility_filters() {
        let config = settings(TargetingMode::Distance);
        let world = snapshot(vec![]);

        let mut dead = enemy(1, 10.0, None);
        dead.alive = false;
        assert!(!is_eligible(&dead, &world, &config, NEUTRAL));

        assert!(!is_eligible(&enemy(1, 301.0, None), &world, &config, NEUTRAL));

        let mut me = enemy(0xAA00, 0.0, None);
        me.faction = ENEMY;
        assert!(!is_eligible(&me, &world, &config, NEUTRAL));

        let mut armor = enemy(1, 10.0, None);
        armor.category = EntityCategory::PoweredArmor;
        assert!(!is_eligible(&armor, &world, &config, NEUTRAL));

        let mut tank = enemy(1, 10.0, None);
        tank.category = EntityCategory::GroundVehicle;
        assert!(!is_eligible(&tank, &world, &config, NEUTRAL));

        let mut thing = enemy(1, 10.0, None);
        thing.category = EntityCategory::Other;
        assert!(!is_eligible(&thing, &world, &config, NEUTRAL));

        let mut turret = enemy(1, 10.0, None);
        turret.category = EntityCategory::Turret;
        assert!(is_eligible(&turret, &world, &config, NEUTRAL));
    }

    #[test]
    fn test_team_filter() {
        let mut config = settings(TargetingMode::Distance);
        let world = snapshot(vec![]);

        let mut friend = enemy(1, 10.0, None);
        friend.faction = OWN;
        assert!(!is_eligible(&friend, &world, &config, NEUTRAL));
        assert!(is_eligible(&friend, &world, &config, OWN));

        config.targeting.target_team = true;
        assert!(is_eligible(&friend, &world, &config, NEUTRAL));
    }
}
