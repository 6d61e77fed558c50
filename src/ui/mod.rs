pub mod hotkey_dialog;
pub mod markup;
pub mod overlay;
pub mod settings;
