pub mod llm_client;
