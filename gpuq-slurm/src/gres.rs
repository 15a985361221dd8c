use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GresParseError {
    #[error("empty gres string")]
    Empty,
    #[error("odd number of gres entities: {0}")]
    OddEntityCount(usize),
    #[error("expected format `{reconstructed}`, got `{input}`")]
    ReconstructionMismatch {
        input: String,
        reconstructed: String,
    },
    #[error("could not parse gpu type entity `{0}`")]
    MalformedTypeEntity(String),
    #[error("could not parse gpu memory entity `{0}`")]
    MalformedMemoryEntity(String),
    #[error("gpu type mismatch: `{type_block}` != `{memory_block}`")]
    TypeMismatch {
        type_block: String,
        memory_block: String,
    },
    #[error("unsupported memory unit in `{0}`, expected G or M")]
    BadMemoryUnit(String),
    #[error("malformed gpu index element `{0}`")]
    BadIndex(String),
}

/// One normalized GPU resource class on a node or job: how many devices
/// of a given type, and how much memory each carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuDescriptor {
    pub gpu_type: String,
    pub count: u32,
    pub memory_gb: u32,
}

impl fmt::Display for GpuDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}({}G)", self.count, self.gpu_type, self.memory_gb)
    }
}

/// Sum of device counts over a descriptor list.
pub fn total_gpu_count(descriptors: &[GpuDescriptor]) -> u32 {
    descriptors.iter().map(|d| d.count).sum()
}

/// Parses a node's raw GRES string into normalized GPU descriptors.
///
/// The grammar, as `sinfo -o %G` emits it, is a comma-joined sequence of
/// N type tokens followed by N memory tokens:
///
/// ```text
/// gpu:A100:2(S:0-15),gpu:A40:2(S:16-31),gpumem:A100:no_consume:80G,gpumem:A40:no_consume:46068M
/// ```
///
/// Splitting happens on the `gpu:`/`gpumem:` block introducers rather
/// than on commas, because the socket info inside `(...)` may itself
/// contain commas. The string is then rebuilt from the parsed pieces and
/// compared against the input; any deviation from the expected block
/// structure shows up as a mismatch there instead of as silently wrong
/// counts. Type tokens and memory tokens are paired by position and must
/// agree on the type name. Memory is normalized to whole gigabytes (`G`
/// taken as-is, `M` floor-divided by 1024).
///
/// The legacy single-type form `gpu:TYPE:COUNT` with no memory block is
/// also accepted and yields `memory_gb = 0`.
///
/// Output order matches the order of first appearance in the input.
pub fn parse_gpu_descriptors(raw: &str) -> Result<Vec<GpuDescriptor>, GresParseError> {
    static BLOCK_RE: OnceLock<Regex> = OnceLock::new();
    // `gpumem:` must come first so the alternation cannot stop at the
    // shared `gpu` prefix.
    let block_re =
        BLOCK_RE.get_or_init(|| Regex::new(r"gpumem:|gpu:").expect("gres block regex is valid"));

    if raw.is_empty() {
        return Err(GresParseError::Empty);
    }

    // Discard everything before the first introducer (an empty piece for
    // well-formed input) and strip the comma each entity carries from the
    // original joining.
    let entities: Vec<&str> = block_re
        .split(raw)
        .skip(1)
        .map(|e| e.strip_suffix(',').unwrap_or(e))
        .collect();

    if entities.is_empty() {
        return Err(GresParseError::Empty);
    }

    // Degenerate legacy form: one type token, no memory block.
    if entities.len() == 1 {
        let entity = entities[0];
        let reconstructed = format!("gpu:{entity}");
        if reconstructed != raw {
            return Err(GresParseError::ReconstructionMismatch {
                input: raw.to_string(),
                reconstructed,
            });
        }
        let (gpu_type, count) = parse_type_entity(entity)?;
        return Ok(vec![GpuDescriptor {
            gpu_type,
            count,
            memory_gb: 0,
        }]);
    }

    if entities.len() % 2 == 1 {
        return Err(GresParseError::OddEntityCount(entities.len()));
    }

    let half = entities.len() / 2;
    let (type_entities, memory_entities) = entities.split_at(half);

    // Self-check: rebuilding the string from the parsed pieces must give
    // back the input, otherwise the block structure was not what we
    // assumed.
    let reconstructed = type_entities
        .iter()
        .map(|e| format!("gpu:{e}"))
        .chain(memory_entities.iter().map(|e| format!("gpumem:{e}")))
        .collect::<Vec<_>>()
        .join(",");
    if reconstructed != raw {
        return Err(GresParseError::ReconstructionMismatch {
            input: raw.to_string(),
            reconstructed,
        });
    }

    type_entities
        .iter()
        .zip(memory_entities)
        .map(|(type_entity, memory_entity)| {
            let (gpu_type, count) = parse_type_entity(type_entity)?;
            let (memory_type, memory_gb) = parse_memory_entity(memory_entity)?;
            if gpu_type != memory_type {
                return Err(GresParseError::TypeMismatch {
                    type_block: gpu_type,
                    memory_block: memory_type,
                });
            }
            Ok(GpuDescriptor {
                gpu_type,
                count,
                memory_gb,
            })
        })
        .collect()
}

/// A type entity has the shape `TYPE:COUNT` with optional trailing
/// socket info, e.g. `A100:2(S:0-15)`.
fn parse_type_entity(entity: &str) -> Result<(String, u32), GresParseError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_.\-]+):(\d+)(\(.*\))?$").expect("gres type regex is valid")
    });

    let captures = re
        .captures(entity)
        .ok_or_else(|| GresParseError::MalformedTypeEntity(entity.to_string()))?;
    let gpu_type = captures[1].to_string();
    let count: u32 = captures[2]
        .parse()
        .map_err(|_| GresParseError::MalformedTypeEntity(entity.to_string()))?;
    Ok((gpu_type, count))
}

/// A memory entity has the shape `TYPE:QUALIFIER:MEMORY`, where the
/// qualifier (typically `no_consume`) may be absent.
fn parse_memory_entity(entity: &str) -> Result<(String, u32), GresParseError> {
    let parts: Vec<&str> = entity.split(':').collect();
    let (gpu_type, memory) = match parts[..] {
        [gpu_type, _, memory] => (gpu_type, memory),
        [gpu_type, memory] => (gpu_type, memory),
        _ => return Err(GresParseError::MalformedMemoryEntity(entity.to_string())),
    };
    Ok((gpu_type.to_string(), convert_to_gb(memory)?))
}

/// Normalizes a memory figure to whole gigabytes, rounding down.
/// `80G` -> 80, `46068M` -> 44; anything else is an error.
fn convert_to_gb(memory: &str) -> Result<u32, GresParseError> {
    if let Some(value) = memory.strip_suffix('G') {
        value
            .parse()
            .map_err(|_| GresParseError::BadMemoryUnit(memory.to_string()))
    } else if let Some(value) = memory.strip_suffix('M') {
        let mb: u32 = value
            .parse()
            .map_err(|_| GresParseError::BadMemoryUnit(memory.to_string()))?;
        Ok(mb / 1024)
    } else {
        Err(GresParseError::BadMemoryUnit(memory.to_string()))
    }
}

/// Expands an allocated-GPU index list like `0-2,5` into the individual
/// indices `[0, 1, 2, 5]`.
///
/// Each comma-separated element is either a bare index or an inclusive
/// `START-END` range with `START <= END`. Anything else is an error; the
/// caller typically falls back to an "unknown" placeholder rather than
/// dropping the record.
pub fn parse_allocated_indices(raw: &str) -> Result<Vec<u32>, GresParseError> {
    let mut indices = Vec::new();
    for element in raw.split(',') {
        match element.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start
                    .parse()
                    .map_err(|_| GresParseError::BadIndex(element.to_string()))?;
                let end: u32 = end
                    .parse()
                    .map_err(|_| GresParseError::BadIndex(element.to_string()))?;
                if start > end {
                    return Err(GresParseError::BadIndex(element.to_string()));
                }
                indices.extend(start..=end);
            }
            None => indices.push(
                element
                    .parse()
                    .map_err(|_| GresParseError::BadIndex(element.to_string()))?,
            ),
        }
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_type_with_memory() {
        let descriptors =
            parse_gpu_descriptors("gpu:A100:2(S:0-15),gpumem:A100:no_consume:80G").unwrap();
        assert_eq!(
            descriptors,
            vec![GpuDescriptor {
                gpu_type: "A100".to_string(),
                count: 2,
                memory_gb: 80,
            }]
        );
        assert_eq!(total_gpu_count(&descriptors), 2);
    }

    #[test]
    fn multiple_types_preserve_input_order() {
        let raw = "gpu:RTX8000:4(S:0-15),gpu:A40:2(S:16-31),\
                   gpumem:RTX8000:no_consume:48G,gpumem:A40:no_consume:46068M";
        let descriptors = parse_gpu_descriptors(raw).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].gpu_type, "RTX8000");
        assert_eq!(descriptors[0].count, 4);
        assert_eq!(descriptors[0].memory_gb, 48);
        assert_eq!(descriptors[1].gpu_type, "A40");
        assert_eq!(descriptors[1].count, 2);
        // 46068M floor-divides to 44G
        assert_eq!(descriptors[1].memory_gb, 44);
        assert_eq!(total_gpu_count(&descriptors), 6);
    }

    #[test]
    fn memory_entity_without_qualifier() {
        let descriptors = parse_gpu_descriptors("gpu:A100:1,gpumem:A100:40G").unwrap();
        assert_eq!(descriptors[0].memory_gb, 40);
    }

    #[test]
    fn legacy_single_form_has_zero_memory() {
        let descriptors = parse_gpu_descriptors("gpu:TITANRTX:8").unwrap();
        assert_eq!(
            descriptors,
            vec![GpuDescriptor {
                gpu_type: "TITANRTX".to_string(),
                count: 8,
                memory_gb: 0,
            }]
        );
    }

    #[test]
    fn odd_entity_count_fails() {
        // A second type block with no matching memory block.
        let err = parse_gpu_descriptors(
            "gpu:A100:2(S:0-15),gpu:A40:2(S:16-31),gpumem:A100:no_consume:80G",
        )
        .unwrap_err();
        assert_eq!(err, GresParseError::OddEntityCount(3));
    }

    #[test]
    fn reconstruction_mismatch_fails() {
        // Garbage between the blocks breaks the rebuilt string.
        let err =
            parse_gpu_descriptors("gpu:A100:2(S:0-15)junk,gpumem:A100:no_consume:80G").unwrap_err();
        assert!(matches!(
            err,
            GresParseError::ReconstructionMismatch { .. }
                | GresParseError::MalformedTypeEntity(_)
        ));
    }

    #[test]
    fn type_name_mismatch_between_blocks_fails() {
        let err = parse_gpu_descriptors("gpu:A100:2(S:0-15),gpumem:A40:no_consume:80G")
            .unwrap_err();
        assert_eq!(
            err,
            GresParseError::TypeMismatch {
                type_block: "A100".to_string(),
                memory_block: "A40".to_string(),
            }
        );
    }

    #[test]
    fn unsupported_memory_unit_fails() {
        let err = parse_gpu_descriptors("gpu:A100:2,gpumem:A100:no_consume:80T").unwrap_err();
        assert_eq!(err, GresParseError::BadMemoryUnit("80T".to_string()));
    }

    #[test]
    fn empty_and_markerless_input_fail() {
        assert_eq!(parse_gpu_descriptors(""), Err(GresParseError::Empty));
        assert_eq!(parse_gpu_descriptors("(null)"), Err(GresParseError::Empty));
    }

    #[test]
    fn indices_expand_ranges_in_order() {
        assert_eq!(parse_allocated_indices("0-2,5").unwrap(), vec![0, 1, 2, 5]);
        assert_eq!(parse_allocated_indices("3").unwrap(), vec![3]);
        assert_eq!(parse_allocated_indices("1,4-6,9").unwrap(), vec![1, 4, 5, 6, 9]);
    }

    #[test]
    fn malformed_indices_fail() {
        assert!(parse_allocated_indices("0-x").is_err());
        assert!(parse_allocated_indices("5-2").is_err());
        assert!(parse_allocated_indices("").is_err());
        assert!(parse_allocated_indices("0,,2").is_err());
    }

    #[test]
    fn descriptor_renders_compact_label() {
        let descriptor = GpuDescriptor {
            gpu_type: "A100".to_string(),
            count: 2,
            memory_gb: 80,
        };
        assert_eq!(descriptor.to_string(), "2xA100(80G)");
    }
}
