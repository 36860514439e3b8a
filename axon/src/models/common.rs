use std::collections::HashMap;

pub type Metadata = HashMap<String, serde_json::Value>;
