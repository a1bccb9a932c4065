use super::*;

mod dom_tree_and_selectors;

pub(super) const CONFIG_FORM_HTML: &str = r#"
    <form id="config-form" action="/calendar" method="get">
      <input id="cal-url" name="cal" type="url">
      <input id="user-tz" name="user-tz" type="hidden">
      <input id="merge" name="mrg" type="checkbox" class="auto-submit" data-delay-ms="0">
      <div id="matchers">
        <fieldset class="match-row">
          <select class="match-property">
            <option value="SUMMARY" selected>Summary</option>
            <option value="DESCRIPTION">Description</option>
            <option value="LOCATION">Location</option>
          </select>
          <select class="match-operator">
            <option value="inc" selected>include</option>
            <option value="exc">exclude</option>
          </select>
          <input class="match-value" type="text">
          <input class="match-arg" type="hidden">
        </fieldset>
      </div>
      <input id="submit-trigger" type="hidden">
    </form>
    <div id="share">
      <input id="url-box" readonly value="http://localhost/calendar?cal=webcal.example.ics">
      <button id="url-copy" type="button">Copy</button>
    </div>
    "#;

// Loads the stock fixture with a pinned timezone so assertions stay
// independent of the host locale.
pub(super) fn loaded_page() -> Result<Page> {
    let mut page = Page::parse(CONFIG_FORM_HTML)?;
    page.set_timezone("Europe/Berlin")?;
    page.load()?;
    Ok(page)
}
