use std::collections::HashMap;

/// Splits the raw output of `scontrol show job -d` into one flat
/// attribute map per job.
///
/// Jobs are separated by blank lines; inside a block, newlines are just
/// extra whitespace between `Key=Value` tokens. Values may themselves
/// contain `=` (command lines, paths), so only the first `=` splits a
/// token. Tokens without an `=` carry no information and are dropped.
pub fn parse_job_blocks(raw: &str) -> Vec<HashMap<String, String>> {
    raw.split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .map(parse_attribute_block)
        .collect()
}

/// Turns a single whitespace-separated `Key=Value` block into a map.
pub fn parse_attribute_block(block: &str) -> HashMap<String, String> {
    block
        .split_whitespace()
        .filter_map(|token| token.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Splits one `||`-delimited node record into its fields, discarding
/// empty ones. `sinfo -N -o "%N||%T||%P||%G"` pads missing columns with
/// nothing, so the caller checks the surviving field count.
pub fn split_node_record(raw: &str) -> Vec<&str> {
    raw.split("||").filter(|field| !field.is_empty()).collect()
}
