use form_enhancer::{Error, Page, Result};

const CONFIG_PAGE_HTML: &str = r#"
    <!DOCTYPE html>
    <html>
    <head>
      <title>Calendar proxy</title>
    </head>
    <body>
      <h1>Proxy configuration</h1>
      <form id="config-form" action="/calendar" method="get">
        <label for="cal-url">Calendar address</label>
        <input id="cal-url" name="cal" type="url" class="auto-submit">
        <input id="user-tz" name="user-tz" type="hidden">
        <label for="merge">Merge overlapping events</label>
        <input id="merge" name="mrg" type="checkbox" class="auto-submit" data-delay-ms="0">
        <div id="matchers">
          <fieldset class="match-row">
            <legend>Filter</legend>
            <select class="match-property">
              <option value="SUMMARY" selected>Summary</option>
              <option value="DESCRIPTION">Description</option>
              <option value="LOCATION">Location</option>
            </select>
            <select class="match-operator">
              <option value="inc" selected>include</option>
              <option value="exc">exclude</option>
            </select>
            <input class="match-value" type="text" placeholder="regular expression">
            <input class="match-arg" type="hidden">
          </fieldset>
        </div>
        <input id="submit-trigger" type="hidden">
        <button id="apply" type="submit">Apply</button>
      </form>
      <div id="share"></div>
    </body>
    </html>
    "#;

fn loaded_config_page() -> Result<Page> {
    let mut page = Page::parse(CONFIG_PAGE_HTML)?;
    page.set_timezone("Europe/Berlin")?;
    page.load()?;
    Ok(page)
}

#[test]
fn full_configuration_round_trip() -> Result<()> {
    let mut page = loaded_config_page()?;

    // Timezone lands in the hidden field before anything is touched.
    page.assert_value("#user-tz", "Europe/Berlin")?;

    // Typing the calendar address auto-submits after the quiet window.
    page.type_text("#cal-url", "webcal://example.com/team.ics")?;
    page.advance_time(999)?;
    assert_eq!(page.refresh_requests().len(), 0);
    page.advance_time(1)?;
    assert_eq!(page.refresh_requests().len(), 1);

    // A filter edit composes the hidden query argument and schedules
    // another submission.
    page.type_text(".match-value", "standup|planning")?;
    page.assert_attr(".match-arg", "name", Some("inc"))?;
    page.assert_value(".match-arg", "SUMMARY=standup|planning")?;
    page.advance_time(1000)?;
    assert_eq!(page.refresh_requests().len(), 2);

    // The merge toggle is wired for immediate submission.
    page.click("#merge")?;
    page.advance_time(0)?;
    assert_eq!(page.refresh_requests().len(), 3);

    // The server response replaces the matcher block and adds the
    // share box; the settle pass wires both.
    page.swap_inner(
        "#matchers",
        r#"
        <fieldset class="match-row" id="row-1">
          <select class="match-property"><option value="SUMMARY" selected>Summary</option></select>
          <select class="match-operator"><option value="inc" selected>include</option></select>
          <input class="match-value" type="text" value="standup|planning">
          <input class="match-arg" type="hidden" name="inc" value="SUMMARY=standup|planning">
        </fieldset>
        <fieldset class="match-row" id="row-2">
          <select class="match-property"><option value="SUMMARY" selected>Summary</option></select>
          <select class="match-operator"><option value="exc" selected>exclude</option></select>
          <input class="match-value" type="text">
          <input class="match-arg" type="hidden">
        </fieldset>
        "#,
    )?;
    page.swap_inner(
        "#share",
        r#"
        <input id="url-box" readonly
               value="http://localhost/calendar?cal=webcal%3A%2F%2Fexample.com%2Fteam.ics&amp;mrg=true&amp;inc=SUMMARY%3Dstandup%7Cplanning">
        <button id="url-copy" type="button">Copy</button>
        "#,
    )?;

    page.type_text("#row-2 .match-value", "cancelled")?;
    page.assert_attr("#row-2 .match-arg", "name", Some("exc"))?;
    page.assert_value("#row-2 .match-arg", "SUMMARY=cancelled")?;

    page.click("#url-copy")?;
    assert_eq!(
        page.clipboard_text(),
        Some(
            "http://localhost/calendar?cal=webcal%3A%2F%2Fexample.com%2Fteam.ics&mrg=true&inc=SUMMARY%3Dstandup%7Cplanning"
        )
    );

    // Native submission stays suppressed throughout.
    page.click("#apply")?;
    page.submit("#config-form")?;
    assert_eq!(page.native_navigation_count(), 0);
    Ok(())
}

#[test]
fn repeated_settles_never_duplicate_copy_handling() -> Result<()> {
    let mut page = loaded_config_page()?;
    page.swap_inner(
        "#share",
        r#"
        <input id="url-box" readonly value="http://localhost/calendar?cal=a.ics">
        <button id="url-copy" type="button">Copy</button>
        "#,
    )?;

    // Settle passes that leave the button in place must not stack
    // click listeners on it.
    for _ in 0..5 {
        page.swap_inner("#matchers", r#"<p>no filters</p>"#)?;
    }
    assert_eq!(page.listener_count("#url-copy", "click")?, 1);

    page.click("#url-copy")?;
    assert_eq!(
        page.clipboard_text(),
        Some("http://localhost/calendar?cal=a.ics")
    );
    Ok(())
}

#[test]
fn enhancement_degrades_to_nothing_on_a_bare_page() -> Result<()> {
    let mut page = Page::from_html("<main id='hello'><p>no form here</p></main>")?;
    page.advance_time(5000)?;
    assert_eq!(page.refresh_requests().len(), 0);
    assert_eq!(page.clipboard_text(), None);
    page.assert_exists("#hello")?;
    Ok(())
}

#[test]
fn selector_errors_surface_to_the_caller() -> Result<()> {
    let mut page = loaded_config_page()?;
    match page.type_text("#does-not-exist", "x") {
        Err(Error::SelectorNotFound(selector)) => assert_eq!(selector, "#does-not-exist"),
        other => panic!("expected missing selector error, got: {other:?}"),
    }
    Ok(())
}
