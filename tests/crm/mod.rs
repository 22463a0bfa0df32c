mod reload;
mod scope;
