pub const SNMP: &str = "printfleet::snmp";
pub const PARSER: &str = "printfleet::parser";
pub const VENDOR: &str = "printfleet::vendor";
pub const DISCOVERY: &str = "printfleet::discovery";
pub const POLLING: &str = "printfleet::polling";
pub const STORAGE: &str = "printfleet::storage";
pub const PIPELINE: &str = "printfleet::pipeline";
pub const WS: &str = "printfleet::ws";
pub const PROXY: &str = "printfleet::proxy";
pub const METRICS: &str = "printfleet::metrics";
