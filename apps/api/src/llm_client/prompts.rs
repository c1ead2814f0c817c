// Prompt fragments for direct provider calls.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured shopping assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Asks for alternatives to the product behind `{url}`. The output schema
/// mirrors the backend's recommendation response so both paths look alike.
pub const ALTERNATIVES_PROMPT: &str = r#"A shopper is looking at this product page: {url}

Identify the product from the URL and find 5 to 6 REAL, currently sold products that are
similar alternatives in the same category and price band (minimum 5, maximum 6).
Prefer products sold on {site}.

Return a JSON object of exactly this shape:
{
  "alternatives": [
    {
      "id": "short-slug",
      "brand": "Brand",
      "model": "Model name",
      "title": "Full listing title",
      "image_url": "",
      "price_estimate": "₹12,999",
      "price_raw": 12999,
      "rating_estimate": 4.3,
      "rating_count_estimate": 1200,
      "specs": ["key spec", "key spec"],
      "connectivity": ["Bluetooth 5.3"],
      "why_pick": "One sentence on why this is a good pick",
      "tradeoffs": "One sentence on what you give up",
      "source_url": "search or product URL on the store",
      "source_site": "amazon | flipkart | other"
    }
  ]
}

Never invent products that do not exist. Leave image_url empty if unsure."#;
