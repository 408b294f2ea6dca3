use std::path::PathBuf;

use chrono::Utc;
use uuid::Uuid;

use super::data::Preset;
use super::persist;

/// Saved extension-to-icon presets (`presets.json`)
#[derive(Debug)]
pub struct PresetList {
    presets: Vec<Preset>,
    file: PathBuf,
}

impl PresetList {
    pub fn open(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let presets = persist::load_list(&file);
        Self { presets, file }
    }

    pub fn list(&self) -> &[Preset] {
        &self.presets
    }

    pub fn get(&self, id: Uuid) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn create(&mut self, name: &str) -> &Preset {
        self.presets.push(Preset::new(name));
        self.save();
        &self.presets[self.presets.len() - 1]
    }

    pub fn rename(&mut self, id: Uuid, name: &str) {
        self.modify(id, |preset| {
            preset.name = name.to_string();
            preset.date_modified = Utc::now();
        });
    }

    pub fn delete(&mut self, id: Uuid) {
        let before = self.presets.len();
        self.presets.retain(|p| p.id != id);
        if self.presets.len() != before {
            self.save();
        }
    }

    pub fn set_mapping(&mut self, id: Uuid, ext: &str, icon_id: Uuid) {
        self.modify(id, |preset| preset.set_mapping(ext, icon_id));
    }

    pub fn remove_mapping(&mut self, id: Uuid, ext: &str) {
        self.modify(id, |preset| preset.remove_mapping(ext));
    }

    fn modify(&mut self, id: Uuid, change: impl FnOnce(&mut Preset)) {
        if let Some(preset) = self.presets.iter_mut().find(|p| p.id == id) {
            change(preset);
            self.save();
        }
    }

    fn save(&self) {
        persist::save_list(&self.file, &self.presets);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_is_case_and_dot_insensitive() {
        let temp = tempfile::tempdir().unwrap();
        let mut presets = PresetList::open(temp.path().join("presets.json"));
        let id = presets.create("Photos").id;
        let icon = Uuid::new_v4();

        presets.set_mapping(id, "JPG", icon);
        assert_eq!(presets.get(id).unwrap().mapping("jpg"), Some(icon));

        presets.remove_mapping(id, ".jpg");
        assert!(presets.get(id).unwrap().mappings.is_empty());
    }

    #[test]
    fn test_presets_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("presets.json");
        let mut presets = PresetList::open(&file);
        let web = presets.create("Web").id;
        presets.set_mapping(web, "ts", Uuid::new_v4());
        presets.set_mapping(web, ".CSS", Uuid::new_v4());
        let docs = presets.create("Docs").id;
        presets.rename(docs, "Documents");

        let reloaded = PresetList::open(&file);
        assert_eq!(reloaded.list(), presets.list());
        assert_eq!(reloaded.get(docs).unwrap().name, "Documents");
    }

    #[test]
    fn test_delete() {
        let temp = tempfile::tempdir().unwrap();
        let mut presets = PresetList::open(temp.path().join("presets.json"));
        let id = presets.create("Temp").id;
        presets.delete(id);
        assert!(presets.get(id).is_none());
    }
}
