//! Prompt rendering for equipment triage.

use crate::traits::EquipmentData;

/// Built-in triage prompt.
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"You are a cybersecurity expert analyzing equipment for inclusion in an inventory system.

Analyze the following equipment data and decide if it should be added to the inventory:

## Equipment Data:
- Hostname: {hostname}
- IP Address: {ip_address}
- MAC Address: {mac_address}
- Operating System: {os} {os_version}
- Asset Type: {asset_type}
- Manufacturer: {manufacturer}
- Model: {model}
- Serial Number: {serial_number}
- Location: {location}
- Department: {department}
- Owner: {owner}
- Tags: {tags}
- Source: {source}

## Decision Criteria:
1. Is this a legitimate enterprise asset?
2. Does it have proper identification (hostname, IP)?
3. Is the OS recognized and supported?
4. Are there any security concerns?

## Output Format (JSON only):
{
    "decision": "approved" | "rejected" | "pending" | "flag",
    "comments": "Brief explanation of decision",
    "confidence": 0.0-1.0,
    "suggested_tags": ["tag1", "tag2"],
    "suggested_risk_score": 0-100,
    "suggested_asset_type": "server" | "workstation" | "network" | "cloud" | "iot" | "other"
}

Respond with ONLY valid JSON, no other text."#;

const UNKNOWN: &str = "Unknown";

/// Substitutes the equipment fields into `template`.
///
/// Absent or empty fields render as `Unknown`; an empty tag list renders as
/// `None`.
/// Unrecognized braces, such as the JSON example in the default template,
/// are left as they are.
pub fn render_prompt(template: &str, equipment: &EquipmentData) -> String {
    let field = |value: &Option<String>| {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN)
            .to_string()
    };
    let tags = if equipment.tags.is_empty() {
        "None".to_string()
    } else {
        equipment.tags.join(", ")
    };

    let substitutions: [(&str, String); 14] = [
        ("{hostname}", field(&equipment.hostname)),
        ("{ip_address}", field(&equipment.ip_address)),
        ("{mac_address}", field(&equipment.mac_address)),
        ("{os}", field(&equipment.os)),
        ("{os_version}", field(&equipment.os_version)),
        ("{asset_type}", field(&equipment.asset_type)),
        ("{manufacturer}", field(&equipment.manufacturer)),
        ("{model}", field(&equipment.model)),
        ("{serial_number}", field(&equipment.serial_number)),
        ("{location}", field(&equipment.location)),
        ("{department}", field(&equipment.department)),
        ("{owner}", field(&equipment.owner)),
        ("{tags}", tags),
        ("{source}", equipment.source.clone()),
    ];

    // Single left-to-right pass so substituted values are never re-scanned.
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match substitutions
            .iter()
            .find(|(placeholder, _)| tail.starts_with(placeholder))
        {
            Some((placeholder, value)) => {
                out.push_str(value);
                rest = &tail[placeholder.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
