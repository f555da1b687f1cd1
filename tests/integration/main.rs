mod helpers;
mod test_moderation_flows;
