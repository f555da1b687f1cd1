pub mod content_precheck;
