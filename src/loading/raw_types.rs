use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RawNode {
    pub node_id: String,
    pub lat: String,
    pub lon: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RawSegment {
    pub segment_id: String,
    pub from_node: String,
    pub to_node: String,
    pub length_m: String,
    pub speed_limit_kmh: String,
    /// Optional polyline as `lon lat;lon lat;...`; straight line between
    /// the endpoints when empty.
    pub geometry: String,
}
