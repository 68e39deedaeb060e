//! Broadcast channel control.

use std::sync::Arc;

use serde_json::Value;

use crate::command::{Converter, ResponseListener, Subscription, raw_payload};
use crate::error::Error;
use crate::protocol::ChannelInfo;

use super::{WebOsTv, field, reject};

const CHANNEL_UP: &str = "ssap://tv/channelUp";
const CHANNEL_DOWN: &str = "ssap://tv/channelDown";
const OPEN_CHANNEL: &str = "ssap://tv/openChannel";
const CHANNEL_LIST: &str = "ssap://tv/getChannelList";
const CURRENT_CHANNEL: &str = "ssap://tv/getCurrentChannel";

// ============================================================================
// TvControl
// ============================================================================

/// Tuner control.
pub trait TvControl {
    /// Switches to the next channel.
    fn channel_up(&self, listener: ResponseListener<Value>);

    /// Switches to the previous channel.
    fn channel_down(&self, listener: ResponseListener<Value>);

    /// Tunes to `channel` by id and/or number.
    ///
    /// A channel with neither identifier is rejected.
    fn set_channel(&self, channel: &ChannelInfo, listener: ResponseListener<Value>);

    /// Lists all tuned channels.
    fn get_channel_list(&self, listener: ResponseListener<Vec<ChannelInfo>>);

    /// Reads the channel currently shown.
    fn get_current_channel(&self, listener: ResponseListener<ChannelInfo>);

    /// Receives every channel change.
    fn subscribe_current_channel(
        &self,
        listener: ResponseListener<ChannelInfo>,
    ) -> Arc<Subscription<ChannelInfo>>;
}

fn channel_converter() -> Converter<ChannelInfo> {
    Box::new(|payload| {
        serde_json::from_value(payload.clone())
            .map_err(|e| Error::payload(format!("channel: {e}")))
    })
}

impl TvControl for WebOsTv {
    fn channel_up(&self, listener: ResponseListener<Value>) {
        self.request(CHANNEL_UP, None, raw_payload(), listener);
    }

    fn channel_down(&self, listener: ResponseListener<Value>) {
        self.request(CHANNEL_DOWN, None, raw_payload(), listener);
    }

    fn set_channel(&self, channel: &ChannelInfo, listener: ResponseListener<Value>) {
        if channel.channel_id.is_none() && channel.channel_number.is_none() {
            reject(&listener, "channel needs an id or a number");
            return;
        }
        self.request(
            OPEN_CHANNEL,
            Some(channel.open_payload()),
            raw_payload(),
            listener,
        );
    }

    fn get_channel_list(&self, listener: ResponseListener<Vec<ChannelInfo>>) {
        self.request(CHANNEL_LIST, None, field("channelList"), listener);
    }

    fn get_current_channel(&self, listener: ResponseListener<ChannelInfo>) {
        self.request(CURRENT_CHANNEL, None, channel_converter(), listener);
    }

    fn subscribe_current_channel(
        &self,
        listener: ResponseListener<ChannelInfo>,
    ) -> Arc<Subscription<ChannelInfo>> {
        self.subscribe(CURRENT_CHANNEL, None, channel_converter(), listener)
    }
}
