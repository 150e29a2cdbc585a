use crate::audio::ProcessorController;
use crate::error::LoadError;
use crate::io::is_supported_file;
use crate::params::{ParamId, ParameterInfo, ParameterStore, ParameterUnit, PARAMETERS};
use std::path::Path;
use std::sync::Arc;

/// Shown until an impulse response has loaded
pub const NO_IMPULSE_TEXT: &str = "No IR loaded";

/// Handle binding one parameter to a UI control
#[derive(Clone)]
pub struct ParameterBinding {
    id: ParamId,
    params: Arc<ParameterStore>,
}

impl ParameterBinding {
    pub fn info(&self) -> &'static ParameterInfo {
        self.id.info()
    }

    pub fn value(&self) -> f32 {
        self.params.value(self.id)
    }

    pub fn set_value(&self, value: f32) -> bool {
        self.params.set_value(self.id, value)
    }

    pub fn normalized(&self) -> f32 {
        self.params.get_normalized(self.id)
    }

    pub fn set_normalized(&self, normalized: f32) -> bool {
        self.params.set_normalized(self.id, normalized)
    }

    /// Current value formatted for display, with unit suffix
    pub fn text(&self) -> String {
        let unit = self.info().unit;
        match unit {
            ParameterUnit::Decibels => format!("{:.1}{}", self.value(), unit.suffix()),
            ParameterUnit::Generic => format!("{:.2}{}", self.value(), unit.suffix()),
        }
    }
}

/// Everything an editor UI talks to: two parameters and the IR file loader
pub struct EditorBridge {
    controller: ProcessorController,
}

impl EditorBridge {
    pub fn new(controller: ProcessorController) -> Self {
        Self { controller }
    }

    /// Parameter descriptors in display order
    pub fn parameters(&self) -> &'static [ParameterInfo] {
        &PARAMETERS
    }

    pub fn binding(&self, id: &str) -> Option<ParameterBinding> {
        ParamId::from_id(id).map(|id| ParameterBinding {
            id,
            params: self.controller.parameters(),
        })
    }

    pub fn bindings(&self) -> Vec<ParameterBinding> {
        ParamId::ALL
            .iter()
            .map(|&id| ParameterBinding {
                id,
                params: self.controller.parameters(),
            })
            .collect()
    }

    /// Whether a drag over the editor carries a file we could load
    pub fn is_interested_in_files<P: AsRef<Path>>(&self, paths: &[P]) -> bool {
        paths.iter().any(is_supported_file)
    }

    /// Load the first supported file of a drop
    pub fn files_dropped<P: AsRef<Path>>(&self, paths: &[P]) -> Result<(), LoadError> {
        match paths.iter().find(|path| is_supported_file(path)) {
            Some(path) => self.load(path),
            None => Err(LoadError::UnsupportedFormat(
                "no WAV or AIFF file in drop".to_string(),
            )),
        }
    }

    /// Load an impulse response chosen by the user
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<(), LoadError> {
        self.controller.load_impulse_response(path)
    }

    /// Name of the loaded file, or a placeholder before the first successful load
    pub fn display_name(&self) -> String {
        self.controller
            .current_impulse_name()
            .unwrap_or_else(|| NO_IMPULSE_TEXT.to_string())
    }

    /// Periodic UI tick
    pub fn idle(&self) {
        self.controller.poll();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::IrLoaderProcessor;
    use crate::config::ProcessorConfig;

    fn editor() -> (IrLoaderProcessor, EditorBridge) {
        let processor = IrLoaderProcessor::new(ProcessorConfig::default());
        let editor = EditorBridge::new(processor.controller());
        (processor, editor)
    }

    #[test]
    fn test_bindings_follow_parameter_order() {
        let (_processor, editor) = editor();
        let ids: Vec<&str> = editor.bindings().iter().map(|b| b.info().id).collect();
        assert_eq!(ids, vec!["mix", "gain"]);
        assert_eq!(editor.parameters().len(), 2);
        assert!(editor.binding("volume").is_none());
    }

    #[test]
    fn test_binding_writes_reach_processor() {
        let (processor, editor) = editor();
        let mix = editor.binding("mix").unwrap();
        mix.set_normalized(0.25);
        assert_eq!(processor.parameters().mix(), 0.25);
        assert_eq!(mix.text(), "0.25");

        let gain = editor.binding("gain").unwrap();
        gain.set_value(-6.0);
        assert_eq!(gain.text(), "-6.0 dB");
        assert_eq!(gain.normalized(), 0.375);
    }

    #[test]
    fn test_file_interest() {
        let (_processor, editor) = editor();
        assert!(editor.is_interested_in_files(&["a.txt", "b.AIFF"]));
        assert!(!editor.is_interested_in_files(&["a.txt", "b.mp3"]));
        assert!(!editor.is_interested_in_files::<&str>(&[]));
    }

    #[test]
    fn test_failed_drop_keeps_placeholder() {
        let (_processor, editor) = editor();
        assert_eq!(editor.display_name(), NO_IMPULSE_TEXT);
        assert!(matches!(
            editor.files_dropped(&["notes.txt"]),
            Err(LoadError::UnsupportedFormat(_))
        ));
        assert!(editor.files_dropped(&["/no/such/dir/room.wav"]).is_err());
        assert_eq!(editor.display_name(), NO_IMPULSE_TEXT);
    }
}
