mod help;
mod price;
mod reload;

use crate::{Data, Error};

pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![price::price(), reload::reload(), help::help()]
}
