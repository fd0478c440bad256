use crate::domain::model::{Agent, GeoPoint, RankedAgent};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// 座標未知時使用的距離，大於地球上任何實際距離
pub const UNREACHABLE_DISTANCE_KM: f64 = 9999.0;

pub const NEAREST_AGENT_LIMIT: usize = 5;

/// Great-circle distance in kilometres. Returns [`UNREACHABLE_DISTANCE_KM`]
/// when either point is unknown.
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let from = GeoPoint::new(from.latitude, from.longitude);
    let to = GeoPoint::new(to.latitude, to.longitude);

    if from.is_unknown() || to.is_unknown() {
        return UNREACHABLE_DISTANCE_KM;
    }

    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();
    let a = ((d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// 依距離由近到遠排序並取前五名；座標缺漏的代理商排在最後而不是被剔除
pub fn rank_by_distance(reference: GeoPoint, candidates: Vec<Agent>) -> Vec<RankedAgent> {
    let mut ranked: Vec<RankedAgent> = candidates
        .into_iter()
        .map(|agent| {
            let coordinate = agent.location();
            let distance = haversine_km(reference, coordinate);
            tracing::debug!(
                "Agent {} ({}): distance = {:.2} km",
                agent.code,
                agent.city.as_deref().unwrap_or("-"),
                distance
            );
            RankedAgent {
                agent,
                distance,
                coordinate,
            }
        })
        .collect();

    // sort_by 為穩定排序，同距離保留輸入順序
    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    ranked.truncate(NEAREST_AGENT_LIMIT);
    ranked
}
