use bidinet_core::CommandError;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::NetworkSession;

impl NetworkSession {
    /// Runs a `network.*` command from its JSON parameters and returns the
    /// JSON result.
    pub async fn dispatch(&self, method: &str, params: Value) -> Result<Value, CommandError> {
        match method {
            "network.addIntercept" => Ok(json!(self.add_intercept(parse(params)?)?)),
            "network.removeIntercept" => {
                self.remove_intercept(parse(params)?)?;
                Ok(json!({}))
            }
            "network.addDataCollector" => Ok(json!(self.add_data_collector(parse(params)?)?)),
            "network.removeDataCollector" => {
                self.remove_data_collector(parse(params)?)?;
                Ok(json!({}))
            }
            "network.continueRequest" => {
                self.continue_request(parse(params)?)?;
                Ok(json!({}))
            }
            "network.continueResponse" => {
                self.continue_response(parse(params)?)?;
                Ok(json!({}))
            }
            "network.continueWithAuth" => {
                self.continue_with_auth(parse(params)?)?;
                Ok(json!({}))
            }
            "network.provideResponse" => {
                self.provide_response(parse(params)?)?;
                Ok(json!({}))
            }
            "network.failRequest" => {
                self.fail_request(parse(params)?)?;
                Ok(json!({}))
            }
            "network.getData" => Ok(json!(self.get_data(parse(params)?).await?)),
            "network.disownData" => {
                self.disown_data(parse(params)?)?;
                Ok(json!({}))
            }
            "network.setCacheBehavior" => {
                self.set_cache_behavior(parse(params)?)?;
                Ok(json!({}))
            }
            _ => Err(CommandError::UnknownCommand(method.to_string())),
        }
    }
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, CommandError> {
    serde_json::from_value(params)
        .map_err(|error| CommandError::invalid_argument(error.to_string()))
}
