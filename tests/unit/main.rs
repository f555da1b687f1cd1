mod test_normalization;
mod test_precheck;
