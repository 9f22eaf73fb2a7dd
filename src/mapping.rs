use std::collections::HashMap;

use indexmap::IndexMap;

use crate::catalog::strip_language_prefix;
use crate::error::AssetError;
use crate::metadata::{Metadata, int_field, str_field};
use crate::schema::Record;

/// Canonical remote path (or extensionless path, or directory) mapped to a
/// human-readable output path. Built once per run, read-only afterwards.
pub type MappingTable = IndexMap<String, String>;

type CharacterNames = HashMap<i64, String>;

/// Character voice lines live in an id range offset from the character
/// table's own ids.
const VOICE_CHARACTER_ID_BASE: i64 = 200_000;

fn sanitize(text: &str) -> String {
    text.replace('/', " ")
        .chars()
        .filter(|ch| !matches!(ch, '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>'))
        .collect()
}

/// True when the entry has no genuine localized name: its English name is
/// identical to one of the other-territory name fields.
fn has_foreign_name(record: &Record) -> bool {
    let english = str_field(record, "name_en");
    ["name_jp", "name_chs_t", "name_chs"]
        .iter()
        .any(|field| str_field(record, field) == english)
}

pub(crate) fn dir_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

pub(crate) fn base_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, base)| base).unwrap_or(path)
}

/// Extension including the dot, empty for extensionless and dot-leading
/// names.
pub(crate) fn ext_of(path: &str) -> &str {
    let base = base_of(path);
    match base.rfind('.') {
        Some(0) | None => "",
        Some(index) => &base[index..],
    }
}

pub(crate) fn stem_of(path: &str) -> &str {
    let base = base_of(path);
    &base[..base.len() - ext_of(path).len()]
}

pub(crate) fn join(dir: &str, base: &str) -> String {
    if dir.is_empty() {
        base.to_string()
    } else {
        format!("{dir}/{base}")
    }
}

fn character_names(metadata: &Metadata) -> CharacterNames {
    let mut names = CharacterNames::from([(0, "Freed Jyanshi".to_string())]);
    for character in metadata.get("item_definition_character").into_iter().flatten() {
        if let Some(id) = int_field(character, "id") {
            names.insert(id, str_field(character, "name_en").to_string());
        }
    }
    names
}

fn build_voice_mappings(
    metadata: &Metadata,
    characters: &CharacterNames,
    table: &mut MappingTable,
) -> Result<(), AssetError> {
    for voice in metadata.get("voice_sound").into_iter().flatten() {
        let voice_type = str_field(voice, "type");
        let original_path = str_field(voice, "path");
        let english_name = str_field(voice, "name_en").to_lowercase();
        let character_id = VOICE_CHARACTER_ID_BASE + int_field(voice, "id").unwrap_or(0);
        // an unresolved id means the table layout changed underneath us
        let character_name = characters
            .get(&character_id)
            .ok_or(AssetError::UnknownCharacterId(character_id))?;

        let mut output = format!("voices/{character_name}/");
        if voice_type.starts_with("fan_") {
            output.push_str("yaku - ");
        }
        if voice_type.starts_with("scfan_") {
            output.push_str("sp yaku - ");
        }
        if voice_type.starts_with("act_") {
            output.push_str("action - ");
        }
        if voice_type.starts_with("gameend_") {
            output.push_str("game end - ");
        }

        if english_name.is_empty() {
            output.push_str(base_of(original_path));
        } else {
            output.push_str(&sanitize(&english_name));
        }

        table.insert(original_path.to_string(), output);
    }
    Ok(())
}

fn title_entry(
    record: &Record,
    path_field: &str,
    default_ext: &str,
    qualifier: &str,
) -> (String, String) {
    let file_path = str_field(record, path_field);
    let ext = match ext_of(file_path) {
        "" => default_ext,
        ext => ext,
    };
    let english_name = str_field(record, "name_en");
    let mut suffix = qualifier.to_string();
    if stem_of(file_path).ends_with('3') {
        suffix = format!(" (sanma){suffix}");
    }

    let output = if !english_name.is_empty() && !has_foreign_name(record) {
        format!("titles/{}{suffix}{ext}", sanitize(english_name))
    } else {
        format!("titles/{}", base_of(file_path))
    };
    (file_path.to_string(), output)
}

fn build_title_mappings(metadata: &Metadata, table: &mut MappingTable) {
    for title in metadata.get("item_definition_title").into_iter().flatten() {
        let (file_path, output) = title_entry(title, "icon", ".png", "");
        let (item_path, item_output) = title_entry(title, "icon_item", ".jpg", " item");

        table.insert(file_path.clone(), output);
        // not every title has the item-icon variant
        if item_path != file_path {
            table.insert(item_path, item_output);
        }
    }
}

fn build_item_mappings(metadata: &Metadata, sheet: &str, table: &mut MappingTable) {
    for item in metadata.get(sheet).into_iter().flatten() {
        let file_path = str_field(item, "icon");
        if file_path.is_empty() || file_path == "-" {
            continue;
        }
        let name = base_of(file_path);
        let ext = match ext_of(name) {
            "" => ".jpg",
            ext => ext,
        };
        let suffix = if name.contains("_limit") { " locked" } else { "" };
        let english_name = str_field(item, "name_en");

        let output = if !english_name.is_empty() && !has_foreign_name(item) {
            format!("items/{}{suffix}{ext}", sanitize(english_name))
        } else {
            format!("items/{name}")
        };
        table.insert(file_path.to_string(), output);
    }
}

fn build_rank_mappings(metadata: &Metadata, table: &mut MappingTable) {
    for rank in metadata
        .get("level_definition_level_definition")
        .into_iter()
        .flatten()
    {
        let file_path = str_field(rank, "primary_icon");
        let name = base_of(file_path);
        let prefix = if name.starts_with("sanma_") { "3p " } else { "" };
        let output = format!(
            "ranks/{prefix}{}{}",
            sanitize(str_field(rank, "name_en")),
            ext_of(name)
        );
        table.insert(file_path.to_string(), output);
    }
}

fn build_skin_mappings(
    metadata: &Metadata,
    characters: &CharacterNames,
    table: &mut MappingTable,
) -> Result<(), AssetError> {
    for skin in metadata.get("item_definition_skin").into_iter().flatten() {
        let file_path = str_field(skin, "path");
        let skin_name = sanitize(str_field(skin, "name_en"));
        let character_id = int_field(skin, "character_id").unwrap_or(0);
        let character_name = sanitize(
            characters
                .get(&character_id)
                .ok_or(AssetError::UnknownCharacterId(character_id))?,
        );

        let output = if character_id == 0 {
            // neutral assets keep the trailing token of their source path
            let token = file_path.rsplit('_').next().unwrap_or("");
            let suffix = if token.is_empty() {
                base_of(file_path)
            } else {
                token
            };
            format!("skins/{character_name}{suffix}")
        } else if int_field(skin, "type") == Some(0) {
            format!("skins/{character_name}/Default")
        } else {
            format!("skins/{character_name}/{skin_name}")
        };
        table.insert(file_path.to_string(), output);
    }
    Ok(())
}

fn build_emote_mappings(metadata: &Metadata, table: &mut MappingTable) {
    for character in metadata.get("item_definition_character").into_iter().flatten() {
        let sprite_path = str_field(character, "emo");
        let output = format!("emotes/{}", sanitize(str_field(character, "name_en")));
        table.insert(sprite_path.to_string(), output);
    }
}

const ITEM_SHEETS: [&str; 6] = [
    "item_definition_item",
    "mall_goods",
    "desktop_chest",
    "exchange_exchange",
    "exchange_searchexchange",
    "mall_month_ticket",
];

/// Builds the flat mapping table. Category builders run in a fixed order
/// and merge last-write-wins into one table, so on a key collision the
/// later category owns the entry.
pub fn build_mappings(metadata: &Metadata) -> Result<MappingTable, AssetError> {
    let characters = character_names(metadata);
    let mut table = MappingTable::new();
    build_voice_mappings(metadata, &characters, &mut table)?;
    build_title_mappings(metadata, &mut table);
    for sheet in ITEM_SHEETS {
        build_item_mappings(metadata, sheet, &mut table);
    }
    build_rank_mappings(metadata, &mut table);
    build_skin_mappings(metadata, &characters, &mut table)?;
    build_emote_mappings(metadata, &mut table);
    Ok(table)
}

/// Resolves a remote path to its output path. Lookup tiers, in order:
/// exact canonical path, canonical path without extension (re-appending
/// the original extension), canonical directory (joined with the original
/// base name), then the `other/` fallback.
pub fn map_path(remote_path: &str, mappings: &MappingTable) -> String {
    let canonical = strip_language_prefix(remote_path);
    let dir = dir_of(canonical);
    let ext = ext_of(canonical);
    let extensionless = join(dir, stem_of(canonical));

    if let Some(output) = mappings.get(canonical) {
        output.clone()
    } else if let Some(output) = mappings.get(&extensionless) {
        format!("{output}{ext}")
    } else if let Some(output) = mappings.get(dir) {
        join(output, base_of(canonical))
    } else {
        join("other", canonical)
    }
}
