use redb::TableDefinition;

pub(crate) const KEY_SEP: char = '\x1f';

/// `label SEP key` -> JSON property map.
pub(crate) const NODES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("nodes");
/// `from_label SEP from_key SEP type SEP to_label SEP to_key` -> JSON property map.
pub(crate) const OUT_EDGES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("out_edges");
/// Reverse adjacency: `to_label SEP to_key SEP type SEP from_label SEP from_key` -> "".
pub(crate) const IN_EDGES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("in_edges");

pub(crate) fn node_key(label: &str, key: &str) -> String {
    format!(
        "{}{KEY_SEP}{}",
        encode_component(label),
        encode_component(key)
    )
}

pub(crate) fn node_edge_prefix(label: &str, key: &str) -> String {
    format!("{}{KEY_SEP}", node_key(label, key))
}

pub(crate) fn edge_key(from: &str, rel_type: &str, to: &str) -> String {
    format!("{from}{KEY_SEP}{}{KEY_SEP}{to}", encode_component(rel_type))
}

/// Turns an outgoing edge key into its incoming counterpart and back.
///
/// Works on the encoded components directly, so no decoding is needed when
/// detaching a node.
pub(crate) fn reverse_edge_key(value: &str) -> Option<String> {
    let (first_label, first_key, rel_type, second_label, second_key) = split_five(value)?;
    Some(format!(
        "{second_label}{KEY_SEP}{second_key}{KEY_SEP}{rel_type}{KEY_SEP}{first_label}{KEY_SEP}{first_key}"
    ))
}

fn split_five(value: &str) -> Option<(&str, &str, &str, &str, &str)> {
    let mut parts = value.splitn(5, KEY_SEP);
    let first = parts.next()?;
    let second = parts.next()?;
    let third = parts.next()?;
    let fourth = parts.next()?;
    let fifth = parts.next()?;
    Some((first, second, third, fourth, fifth))
}

pub(crate) fn encode_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.as_bytes() {
        if *byte == (KEY_SEP as u8) || *byte == b'%' || !byte.is_ascii() {
            encoded.push('%');
            encoded.push(nibble_to_hex(byte >> 4));
            encoded.push(nibble_to_hex(byte & 0x0f));
        } else {
            encoded.push(*byte as char);
        }
    }
    encoded
}

fn nibble_to_hex(value: u8) -> char {
    match value {
        0..=9 => (b'0' + value) as char,
        10..=15 => (b'A' + (value - 10)) as char,
        _ => '0',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_escapes_separator_and_percent() {
        assert_eq!(encode_component("a\x1fb%c"), "a%1Fb%25c");
        assert_eq!(encode_component("plain"), "plain");
    }

    #[test]
    fn node_prefix_does_not_match_longer_keys() {
        let short = node_edge_prefix("Location", "\"A\"");
        let edge_of_longer = edge_key(
            &node_key("Location", "\"AB\""),
            "ROAD_TO",
            &node_key("Location", "\"A\""),
        );
        assert!(!edge_of_longer.starts_with(&short));
    }

    #[test]
    fn reverse_edge_key_swaps_endpoints() {
        let from = node_key("OSM_NODE", "1");
        let to = node_key("OSM_NODE", "2");
        let outgoing = edge_key(&from, "OSM_ROAD", &to);
        let incoming = edge_key(&to, "OSM_ROAD", &from);
        assert_eq!(reverse_edge_key(&outgoing).as_deref(), Some(incoming.as_str()));
        assert_eq!(reverse_edge_key(&incoming).as_deref(), Some(outgoing.as_str()));
    }

    #[test]
    fn separator_inside_ids_stays_inside_one_component() {
        let from = node_key("Location", "\"x\x1fy\"");
        let to = node_key("Location", "\"z\"");
        let outgoing = edge_key(&from, "ROAD_TO", &to);
        let reversed = reverse_edge_key(&outgoing).expect("five components");
        assert!(reversed.ends_with(&from));
    }
}
